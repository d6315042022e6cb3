//! A participant's season history and season-over-season evolution.

use std::collections::BTreeSet;

use chrono::Datelike;
use serde::Serialize;

use crate::prize::{in_season, season_number, seasons};
use crate::record::Transaction;

/// One subject's activity in one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonSummary {
    pub season: String,
    pub points: f64,
    /// Ledger rows counted in `points`.
    pub sales: usize,
    /// Distinct documents and labels that sold under the subject.
    pub documents: usize,
    pub labels: usize,
    /// `points / sales`, `0` without sales.
    pub average_points: f64,
}

/// Totals per season for `subject_key`, oldest season first.
///
/// Every season present in the ledger gets a row, so seasons without sales
/// show as zeros.
pub fn season_history(transactions: &[Transaction], subject_key: &str) -> Vec<SeasonSummary> {
    let mut all = seasons(transactions);
    all.reverse();
    all.into_iter()
        .map(|season| summarize(transactions, subject_key, season))
        .collect()
}

fn summarize(transactions: &[Transaction], subject_key: &str, season: String) -> SeasonSummary {
    let mut points = 0.0;
    let mut sales = 0;
    let mut documents = BTreeSet::new();
    let mut labels = BTreeSet::new();
    for t in transactions
        .iter()
        .filter(|t| t.subject_key == subject_key && in_season(t, &season))
    {
        points += t.points;
        sales += 1;
        if !t.document_id.is_empty() {
            documents.insert(t.document_id.as_str());
        }
        if !t.label.is_empty() {
            labels.insert(t.label.as_str());
        }
    }
    SeasonSummary {
        season,
        points,
        sales,
        documents: documents.len(),
        labels: labels.len(),
        average_points: if sales > 0 { points / sales as f64 } else { 0.0 },
    }
}

/// Change against the previous season.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "evolution", rename_all = "snake_case")]
pub enum Evolution {
    /// `(current - previous) / previous`.
    Change { fraction: f64 },
    /// Points now, none in the comparable months of the previous season.
    New,
    /// Nothing in either season.
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonEvolution {
    pub season: String,
    pub previous_season: String,
    pub points: f64,
    /// Previous-season points restricted to the calendar months the current
    /// season has sales in, so a season in progress compares like for like.
    pub previous_points: f64,
    pub evolution: Evolution,
}

/// Compare `subject_key`'s points in `season` against the season numbered one
/// lower ("Season 3" against "Season 2").
///
/// `None` when the subject has no sales in `season`, or the label carries no
/// season number to step back from.
pub fn season_evolution(
    transactions: &[Transaction],
    subject_key: &str,
    season: &str,
) -> Option<SeasonEvolution> {
    let previous_season = previous_label(season)?;

    let current: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.subject_key == subject_key && in_season(t, season))
        .collect();
    if current.is_empty() {
        return None;
    }
    let points: f64 = current.iter().map(|t| t.points).sum();
    let months: BTreeSet<u32> = current
        .iter()
        .filter_map(|t| t.occurred_at)
        .map(|d| d.month())
        .collect();

    let previous_points: f64 = transactions
        .iter()
        .filter(|t| t.subject_key == subject_key && in_season(t, &previous_season))
        .filter(|t| t.occurred_at.is_some_and(|d| months.contains(&d.month())))
        .map(|t| t.points)
        .sum();

    let evolution = if previous_points == 0.0 {
        if points > 0.0 {
            Evolution::New
        } else {
            Evolution::Flat
        }
    } else {
        Evolution::Change {
            fraction: (points - previous_points) / previous_points,
        }
    };

    Some(SeasonEvolution {
        season: season.to_string(),
        previous_season,
        points,
        previous_points,
        evolution,
    })
}

fn previous_label(season: &str) -> Option<String> {
    let number = season_number(season)?.checked_sub(1)?;
    match season.rsplit_once(' ') {
        Some((prefix, _)) => Some(format!("{prefix} {number}")),
        None => Some(number.to_string()),
    }
}
