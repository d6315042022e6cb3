pub mod coerce;
pub mod history;
pub mod prize;
pub mod progress;
pub mod ranking;
pub mod record;
pub mod schema;

pub use coerce::FieldError;
pub use history::{Evolution, SeasonEvolution, SeasonSummary, season_evolution, season_history};
pub use prize::{PrizeProgress, prize_winners, season_total, seasons};
pub use progress::{Deadline, ProgressCard, Standing};
pub use ranking::{
    AggregateRow, LeaderboardEntry, SubjectProgress, aggregate, leaderboard, progress_from_fields,
    rank_all, rank_and_qualify, subject_progress,
};
pub use record::{Campaign, CampaignKind, CampaignSpec, Prize, SpecFields, Status, Transaction};
pub use schema::tabular;
