//! Season prizes: a fixed points target over one season, no bonus, no cap.

use serde::Serialize;

use crate::ranking::{self, LeaderboardEntry};
use crate::record::Transaction;

/// Subjects whose season total reaches `target_points`, highest first.
pub fn prize_winners(
    transactions: &[Transaction],
    season: &str,
    target_points: f64,
) -> Vec<LeaderboardEntry> {
    let rows = ranking::aggregate_by(transactions, |t| in_season(t, season));
    ranking::rank_and_qualify(&rows, 0.0, target_points, 0)
}

/// One subject's points across a season.
pub fn season_total(transactions: &[Transaction], season: &str, subject_key: &str) -> f64 {
    transactions
        .iter()
        .filter(|t| t.subject_key == subject_key && in_season(t, season))
        .map(|t| t.points)
        .sum()
}

/// Distinct season labels present in the ledger, latest first.
///
/// Labels ending in a number ("Season 10") order numerically; others order
/// lexically after them.
pub fn seasons(transactions: &[Transaction]) -> Vec<String> {
    let mut labels: Vec<&str> = transactions
        .iter()
        .filter_map(|t| t.season.as_deref())
        .collect();
    labels.sort_unstable();
    labels.dedup();

    labels.sort_by(|a, b| match (season_number(a), season_number(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.cmp(a),
    });
    labels.into_iter().map(str::to_string).collect()
}

/// Trailing number of a season label: `"Season 10"` → `10`.
pub(crate) fn season_number(label: &str) -> Option<u32> {
    label.rsplit(' ').next()?.parse().ok()
}

pub(crate) fn in_season(t: &Transaction, season: &str) -> bool {
    t.season.as_deref() == Some(season)
}

/// A participant's standing against one prize target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrizeProgress {
    pub total_points: f64,
    pub target_points: f64,
    pub achieved: bool,
    /// Points still missing, never negative.
    pub remaining: f64,
    /// Share of the target reached, in `[0, 1]`. `0` for a non-positive target.
    pub fraction: f64,
}

impl PrizeProgress {
    pub fn new(total_points: f64, target_points: f64) -> Self {
        let achieved = total_points >= target_points;
        Self {
            total_points,
            target_points,
            achieved,
            remaining: (target_points - total_points).max(0.0),
            fraction: bounded_fraction(total_points, target_points),
        }
    }
}

/// `points / target` clamped to `[0, 1]`, or `0` when the target is not positive.
pub fn bounded_fraction(points: f64, target: f64) -> f64 {
    if target > 0.0 {
        (points / target).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
