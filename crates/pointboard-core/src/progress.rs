//! Participant progress cards for campaigns and activations.

use chrono::NaiveDate;
use serde::Serialize;

use crate::prize::bounded_fraction;
use crate::ranking::SubjectProgress;
use crate::record::CampaignKind;

/// Where the participant sits relative to the winners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "standing", rename_all = "snake_case")]
pub enum Standing {
    /// Inside the capped winner set.
    Winning { rank: usize, cap: usize },
    /// Not a winner yet. `points_needed` reaches the minimum and passes the
    /// cutoff when the subject ranks outside the cap.
    Chasing {
        rank: usize,
        cap: usize,
        points_needed: f64,
    },
    /// No cap: only the minimum matters.
    Open { points_needed: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "deadline", content = "days", rename_all = "snake_case")]
pub enum Deadline {
    EndsIn(i64),
    Finished,
    /// The campaign window could not be read.
    Unknown,
}

impl Deadline {
    pub fn new(window_end: NaiveDate, today: NaiveDate) -> Self {
        let days = (window_end - today).num_days();
        if days >= 0 {
            Self::EndsIn(days)
        } else {
            Self::Finished
        }
    }
}

/// Everything a progress card needs, computed from a [`SubjectProgress`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressCard {
    pub title: String,
    pub kind: CampaignKind,
    pub points: f64,
    pub minimum_points: f64,
    /// Progress bar fill toward the minimum, in `[0, 1]`.
    pub fraction: f64,
    pub meets_minimum: bool,
    pub standing: Standing,
    pub deadline: Deadline,
}

impl ProgressCard {
    pub fn new(
        title: impl Into<String>,
        kind: CampaignKind,
        progress: &SubjectProgress,
        deadline: Deadline,
    ) -> Self {
        Self {
            title: title.into(),
            kind,
            points: progress.points,
            minimum_points: progress.minimum_points,
            fraction: bounded_fraction(progress.points, progress.minimum_points),
            meets_minimum: progress.points >= progress.minimum_points,
            standing: standing(progress),
            deadline,
        }
    }
}

fn standing(p: &SubjectProgress) -> Standing {
    let cap = p.winner_cap;
    if cap == 0 {
        return Standing::Open {
            points_needed: (p.minimum_points - p.points).max(0.0),
        };
    }
    let within_cap = (1..=cap).contains(&p.rank);
    if within_cap && p.points >= p.minimum_points {
        return Standing::Winning { rank: p.rank, cap };
    }
    let to_minimum = p.minimum_points - p.points;
    let points_needed = if within_cap {
        to_minimum
    } else {
        // One point past the cutoff beats the last winner outright.
        let cutoff = p.cutoff_points.unwrap_or(p.minimum_points);
        (cutoff - p.points + 1.0).max(to_minimum)
    };
    Standing::Chasing {
        rank: p.rank,
        cap,
        points_needed: points_needed.max(0.0),
    }
}
