//! Typed records shared between the ledger store, the ranking engine, and the CLI.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coerce::{self, FieldError};

/// One point-earning sale from the transaction ledger.
///
/// Many transactions share a `subject_key`: an account may consolidate several
/// underlying documents and people into one ranked entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sale date. `None` when the ledger cell was empty or unparseable;
    /// such transactions never fall inside a window.
    pub occurred_at: Option<NaiveDate>,
    /// Points earned. Returns and adjustments are negative.
    pub points: f64,
    /// Consolidated key of the rewarded party.
    pub subject_key: String,
    /// Human-readable name of the underlying person or store.
    pub label: String,
    /// Underlying document (CPF/CNPJ) folded into the subject.
    pub document_id: String,
    /// Season display label, e.g. "Season 3".
    pub season: Option<String>,
}

/// Evaluation parameters of a campaign or activation.
///
/// `window_start <= window_end` is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CampaignSpec {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub minimum_points: f64,
    pub bonus_pct: f64,
    /// Maximum number of ranked winners. `0` means unlimited.
    pub winner_cap: usize,
}

impl CampaignSpec {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.window_start && date <= self.window_end
    }
}

/// Raw, untyped campaign fields as they appear in a repository row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecFields {
    pub start: Option<String>,
    pub end: Option<String>,
    pub minimum: Option<String>,
    pub bonus_pct: Option<String>,
    pub winner_cap: Option<String>,
}

impl SpecFields {
    /// Resolve into a [`CampaignSpec`].
    ///
    /// Numeric fields never fail: a missing value means `0`, a malformed one
    /// is logged and also treated as `0`. Only the window is required.
    pub fn resolve(&self) -> Result<CampaignSpec, FieldError> {
        let window_start = coerce::date_field("start_date", self.start.as_deref())?;
        let window_end = coerce::date_field("end_date", self.end.as_deref())?;

        let minimum_points = or_neutral(
            coerce::number_field("minimum_points", self.minimum.as_deref()),
            0.0,
        );
        let bonus_pct = or_neutral(
            coerce::number_field("bonus_pct", self.bonus_pct.as_deref()),
            0.0,
        );
        let winner_cap = or_neutral(
            coerce::count_field("winner_cap", self.winner_cap.as_deref()),
            0,
        );

        Ok(CampaignSpec {
            window_start,
            window_end,
            minimum_points,
            bonus_pct,
            winner_cap,
        })
    }
}

fn or_neutral<T>(value: Result<T, FieldError>, neutral: T) -> T {
    match value {
        Ok(v) => v,
        Err(FieldError::Missing(_)) => neutral,
        Err(e) => {
            warn!(error = %e, "coercing malformed field to neutral default");
            neutral
        }
    }
}

/// Which listing a campaign row comes from. Both are evaluated identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignKind {
    /// Long-running accelerator challenge.
    Campaign,
    /// Short event, usually with a winner cap.
    Activation,
}

impl fmt::Display for CampaignKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Campaign => write!(f, "Campaign"),
            Self::Activation => write!(f, "Activation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Active,
    Finished,
}

impl Status {
    /// Parse a status cell. Missing or unrecognised values read as `Active`,
    /// matching rows written before the column existed.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("finished" | "finalizada" | "finalizado" | "closed") => Self::Finished,
            _ => Self::Active,
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// A campaign or activation row from the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub title: String,
    /// Reward on offer.
    pub prize: String,
    pub description: String,
    pub status: Status,
    pub kind: CampaignKind,
    pub fields: SpecFields,
}

impl Campaign {
    pub fn spec(&self) -> Result<CampaignSpec, FieldError> {
        self.fields.resolve()
    }
}

/// Order campaigns for display: active rows first, original order otherwise.
pub fn active_first(campaigns: &mut [Campaign]) {
    campaigns.sort_by_key(|c| !c.status.is_active());
}

/// Category value that makes a prize apply to every participant.
pub const ALL_CATEGORIES: &str = "All";

/// A season prize with a points target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prize {
    pub title: String,
    pub target_points: f64,
    pub season: String,
    pub description: String,
    pub status: Status,
    pub target_category: String,
}

impl Prize {
    /// Whether the prize is offered to a participant of `category`.
    pub fn applies_to(&self, category: &str) -> bool {
        let target = self.target_category.trim();
        target.eq_ignore_ascii_case(ALL_CATEGORIES)
            || target.eq_ignore_ascii_case("Todas")
            || target == category
    }
}
