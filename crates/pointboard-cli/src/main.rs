mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pointboard_core::record::active_first;
use pointboard_core::tabular::LedgerColumns;
use pointboard_core::{
    Campaign, CampaignKind, CampaignSpec, Deadline, LeaderboardEntry, Prize, PrizeProgress,
    ProgressCard, SeasonEvolution, SeasonSummary, leaderboard, prize_winners,
    progress_from_fields, season_evolution, season_history, season_total, seasons,
    subject_progress,
};
use pointboard_store::Ledger;
use serde::Serialize;
use tracing::{Level, info, warn};

#[derive(Parser)]
#[command(
    name = "pointboard",
    version,
    about = "Campaign leaderboards, progress cards and season prizes from a points ledger"
)]
struct Cli {
    /// Transaction ledger (CSV).
    #[arg(
        long,
        global = true,
        env = "POINTBOARD_TRANSACTIONS",
        default_value = "transactions.csv"
    )]
    transactions: PathBuf,

    #[command(flatten)]
    catalogs: CatalogArgs,

    #[command(flatten)]
    columns: ColumnArgs,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CatalogArgs {
    #[arg(long, global = true, env = "POINTBOARD_CAMPAIGNS", default_value = "campaigns.csv")]
    campaigns: PathBuf,

    #[arg(
        long,
        global = true,
        env = "POINTBOARD_ACTIVATIONS",
        default_value = "activations.csv"
    )]
    activations: PathBuf,

    #[arg(
        long,
        global = true,
        env = "POINTBOARD_PRIZES",
        default_value = "season_prizes.csv"
    )]
    prizes: PathBuf,
}

impl CatalogArgs {
    fn for_kind(&self, kind: CampaignKind) -> &Path {
        match kind {
            CampaignKind::Campaign => &self.campaigns,
            CampaignKind::Activation => &self.activations,
        }
    }
}

/// Ledger column names, for exports that use their own headers.
#[derive(Args)]
struct ColumnArgs {
    #[arg(long, global = true, env = "POINTBOARD_DATE_COLUMN", default_value = "sale_date")]
    date_column: String,

    #[arg(long, global = true, env = "POINTBOARD_POINTS_COLUMN", default_value = "points")]
    points_column: String,

    #[arg(
        long,
        global = true,
        env = "POINTBOARD_SUBJECT_COLUMN",
        default_value = "account_key"
    )]
    subject_column: String,

    #[arg(long, global = true, env = "POINTBOARD_LABEL_COLUMN", default_value = "specifier")]
    label_column: String,

    #[arg(
        long,
        global = true,
        env = "POINTBOARD_DOCUMENT_COLUMN",
        default_value = "document_id"
    )]
    document_column: String,

    #[arg(long, global = true, env = "POINTBOARD_SEASON_COLUMN", default_value = "season")]
    season_column: String,
}

impl From<ColumnArgs> for LedgerColumns {
    fn from(args: ColumnArgs) -> Self {
        Self {
            date: args.date_column,
            points: args.points_column,
            subject_key: args.subject_column,
            label: args.label_column,
            document_id: args.document_column,
            season: args.season_column,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Rank the qualified winners of each campaign or activation.
    Winners {
        #[arg(long, value_enum, default_value_t = Kind::Campaign)]
        kind: Kind,
        /// Only campaigns whose title contains this text (case-insensitive).
        #[arg(long)]
        title: Option<String>,
    },
    /// One participant's progress in every active activation and campaign.
    Progress {
        /// Subject key as it appears in the ledger.
        subject: String,
        /// Reference date for deadlines (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Season prize winners, or one participant's progress toward each prize.
    Prizes {
        /// Season label. Defaults to the latest season in the ledger.
        #[arg(long)]
        season: Option<String>,
        /// Show this participant's progress instead of the winners.
        #[arg(long)]
        subject: Option<String>,
        /// Participant category; prizes targeting other categories are hidden.
        #[arg(long, requires = "subject")]
        category: Option<String>,
    },
    /// One participant's totals per season and evolution against the previous season.
    History {
        /// Subject key as it appears in the ledger.
        subject: String,
        /// Season to compare. Defaults to the latest season in the ledger.
        #[arg(long)]
        season: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Campaign,
    Activation,
}

impl From<Kind> for CampaignKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Campaign => Self::Campaign,
            Kind::Activation => Self::Activation,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();
    info!("pointboard v{}", env!("CARGO_PKG_VERSION"));

    let columns = LedgerColumns::from(cli.columns);
    let ledger = Ledger::open(&cli.transactions, &columns)
        .with_context(|| format!("failed to load ledger {}", cli.transactions.display()))?;

    match cli.command {
        Command::Winners { kind, title } => {
            cmd_winners(&ledger, &cli.catalogs, kind.into(), title.as_deref(), cli.json)
        }
        Command::Progress { subject, today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            cmd_progress(&ledger, &cli.catalogs, &subject, today, cli.json)
        }
        Command::Prizes {
            season,
            subject,
            category,
        } => match subject {
            Some(subject) => cmd_prize_progress(
                &ledger,
                &cli.catalogs.prizes,
                &subject,
                season,
                category.as_deref(),
                cli.json,
            ),
            None => cmd_prize_winners(&ledger, &cli.catalogs.prizes, season.as_deref(), cli.json),
        },
        Command::History { subject, season } => cmd_history(&ledger, &subject, season, cli.json),
    }
}

// ── winners ──

#[derive(Serialize)]
struct CampaignWinners<'a> {
    campaign: &'a Campaign,
    spec: Option<CampaignSpec>,
    /// Why the campaign could not be evaluated.
    error: Option<String>,
    winners: Vec<LeaderboardEntry>,
}

fn cmd_winners(
    ledger: &Ledger,
    catalogs: &CatalogArgs,
    kind: CampaignKind,
    title: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let path = catalogs.for_kind(kind);
    let mut campaigns = pointboard_store::load_campaigns(path, kind)
        .with_context(|| format!("failed to load {}", path.display()))?;
    if let Some(needle) = title.map(str::to_lowercase) {
        campaigns.retain(|c| c.title.to_lowercase().contains(&needle));
    }
    active_first(&mut campaigns);

    let results: Vec<CampaignWinners<'_>> = campaigns
        .iter()
        .map(|campaign| match campaign.spec() {
            Ok(spec) => CampaignWinners {
                campaign,
                spec: Some(spec),
                error: None,
                winners: leaderboard(ledger.transactions(), &spec),
            },
            Err(e) => {
                warn!(title = %campaign.title, error = %e, "cannot evaluate campaign");
                CampaignWinners {
                    campaign,
                    spec: None,
                    error: Some(e.to_string()),
                    winners: Vec::new(),
                }
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No {} registered in {}.", kind, path.display());
        return Ok(());
    }
    for r in &results {
        print!("{}", display::render_campaign_header(r.campaign, r.spec.as_ref()));
        match &r.error {
            Some(error) => println!("  Cannot evaluate: {error}"),
            None => print!("{}", display::render_leaderboard(&r.winners, kind)),
        }
        println!();
    }
    Ok(())
}

// ── progress ──

#[derive(Serialize)]
struct ParticipantProgress<'a> {
    subject_key: &'a str,
    documents: Vec<&'a str>,
    cards: Vec<ProgressCard>,
}

fn cmd_progress(
    ledger: &Ledger,
    catalogs: &CatalogArgs,
    subject: &str,
    today: NaiveDate,
    json: bool,
) -> anyhow::Result<()> {
    require_subject(ledger, subject)?;

    let mut cards = Vec::new();
    for kind in [CampaignKind::Activation, CampaignKind::Campaign] {
        let path = catalogs.for_kind(kind);
        let campaigns = pointboard_store::load_campaigns(path, kind)
            .with_context(|| format!("failed to load {}", path.display()))?;
        for campaign in campaigns.iter().filter(|c| c.status.is_active()) {
            cards.push(progress_card(ledger, campaign, subject, today));
        }
    }

    let report = ParticipantProgress {
        subject_key: subject,
        documents: ledger.document_ids(subject).into_iter().collect(),
        cards,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{subject}");
    if report.documents.len() > 1 {
        println!(
            "  {} consolidated documents: {}",
            report.documents.len(),
            display::format_documents(report.documents.iter().copied())
        );
    }
    println!();
    if report.cards.is_empty() {
        println!("No active campaigns or activations.");
    }
    for card in &report.cards {
        println!("{}", display::render_card(card));
    }
    Ok(())
}

fn progress_card(
    ledger: &Ledger,
    campaign: &Campaign,
    subject: &str,
    today: NaiveDate,
) -> ProgressCard {
    let (progress, deadline) = match campaign.spec() {
        Ok(spec) => (
            subject_progress(ledger.transactions(), &spec, subject),
            Deadline::new(spec.window_end, today),
        ),
        Err(_) => (
            progress_from_fields(ledger.transactions(), &campaign.fields, subject),
            Deadline::Unknown,
        ),
    };
    ProgressCard::new(campaign.title.as_str(), campaign.kind, &progress, deadline)
}

// ── prizes ──

#[derive(Serialize)]
struct PrizeWinners<'a> {
    prize: &'a Prize,
    winners: Vec<LeaderboardEntry>,
}

fn cmd_prize_winners(
    ledger: &Ledger,
    path: &Path,
    season: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let mut prizes = load_prizes(path)?;
    if let Some(season) = season {
        prizes.retain(|p| p.season == season);
    }
    prizes.sort_by_key(|p| !p.status.is_active());

    let results: Vec<PrizeWinners<'_>> = prizes
        .iter()
        .map(|prize| PrizeWinners {
            prize,
            winners: prize_winners(ledger.transactions(), &prize.season, prize.target_points),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No season prizes registered.");
    }
    for r in &results {
        println!("{}", display::render_prize_winners(r.prize, &r.winners));
    }
    Ok(())
}

#[derive(Serialize)]
struct PrizeStanding<'a> {
    prize: &'a Prize,
    progress: PrizeProgress,
}

fn cmd_prize_progress(
    ledger: &Ledger,
    path: &Path,
    subject: &str,
    season: Option<String>,
    category: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    require_subject(ledger, subject)?;
    let Some(season) = season.or_else(|| seasons(ledger.transactions()).into_iter().next()) else {
        println!("No seasons in the ledger.");
        return Ok(());
    };
    let total = season_total(ledger.transactions(), &season, subject);

    let prizes = load_prizes(path)?;
    let standings: Vec<PrizeStanding<'_>> = prizes
        .iter()
        .filter(|p| p.status.is_active() && p.season == season)
        .filter(|p| category.is_none_or(|c| p.applies_to(c)))
        .map(|prize| PrizeStanding {
            prize,
            progress: PrizeProgress::new(total, prize.target_points),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&standings)?);
        return Ok(());
    }

    println!("{subject}  •  {season}: {} pts\n", display::format_points(total));
    if standings.is_empty() {
        println!("No prizes on offer this season.");
    }
    for s in &standings {
        println!("{}", display::render_prize_progress(s.prize, &s.progress));
    }
    Ok(())
}

fn load_prizes(path: &Path) -> anyhow::Result<Vec<Prize>> {
    pointboard_store::load_prizes(path).with_context(|| format!("failed to load {}", path.display()))
}

fn require_subject(ledger: &Ledger, subject: &str) -> anyhow::Result<()> {
    if !ledger.contains_subject(subject) {
        bail!("no sales found for {subject}");
    }
    Ok(())
}

// ── history ──

#[derive(Serialize)]
struct SeasonReport<'a> {
    subject_key: &'a str,
    seasons: Vec<SeasonSummary>,
    evolution: Option<SeasonEvolution>,
}

fn cmd_history(
    ledger: &Ledger,
    subject: &str,
    season: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    require_subject(ledger, subject)?;
    let history = season_history(ledger.transactions(), subject);
    let evolution = season
        .or_else(|| history.last().map(|s| s.season.clone()))
        .and_then(|season| season_evolution(ledger.transactions(), subject, &season));

    let report = SeasonReport {
        subject_key: subject,
        seasons: history,
        evolution,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{subject}\n");
    if report.seasons.is_empty() {
        println!("No seasons in the ledger.");
        return Ok(());
    }
    print!(
        "{}",
        display::render_history(&report.seasons, report.evolution.as_ref())
    );
    Ok(())
}
