//! Terminal rendering for winner tables, progress cards, and season prizes.
//!
//! Every renderer returns a `String` so the caller decides where it goes.
//! Points are shown rounded, with `.` as the thousands separator.

use pointboard_core::{
    Campaign, CampaignKind, CampaignSpec, Deadline, Evolution, LeaderboardEntry, Prize,
    PrizeProgress, ProgressCard, SeasonEvolution, SeasonSummary, Standing,
};

const BAR_WIDTH: usize = 30;
const MAX_NAMES_WIDTH: usize = 40;

// ── Campaign winners ──

/// Title line and parameters of a campaign.
pub fn render_campaign_header(campaign: &Campaign, spec: Option<&CampaignSpec>) -> String {
    let mut out = format!(
        "=== {} ({}, {}) ===\n",
        campaign.title, campaign.kind, campaign.status
    );
    if let Some(spec) = spec {
        let cap = match spec.winner_cap {
            0 => "no winner limit".to_string(),
            n => format!("Top {n}"),
        };
        out.push_str(&format!(
            "  {} to {}  |  minimum {}  |  bonus {}%  |  {}\n",
            spec.window_start.format("%d/%m/%Y"),
            spec.window_end.format("%d/%m/%Y"),
            format_points(spec.minimum_points),
            spec.bonus_pct,
            cap,
        ));
    }
    if !campaign.prize.is_empty() {
        out.push_str(&format!("  Prize: {}\n", campaign.prize));
    }
    if !campaign.description.is_empty() {
        out.push_str(&format!("  {}\n", campaign.description));
    }
    out
}

/// Ranked winners table. Campaigns list the consolidated names and documents;
/// activations only the participant.
pub fn render_leaderboard(entries: &[LeaderboardEntry], kind: CampaignKind) -> String {
    if entries.is_empty() {
        return "  Nobody has reached the minimum yet.\n".to_string();
    }

    let mut out = format!("  {} qualified\n", entries.len());
    match kind {
        CampaignKind::Campaign => {
            out.push_str(&format!(
                "  {:>4}  {:<28}  {:<width$}  {:>12}  {}\n",
                "Rank",
                "Group",
                "Names",
                "Total",
                "Documents",
                width = MAX_NAMES_WIDTH
            ));
            for e in entries {
                out.push_str(&format!(
                    "  {:>4}  {:<28}  {:<width$}  {:>12}  {}\n",
                    e.rank,
                    e.subject_key,
                    truncate(&e.labels_display(), MAX_NAMES_WIDTH),
                    format_points(e.total_points),
                    format_documents(e.document_ids.iter().map(String::as_str)),
                    width = MAX_NAMES_WIDTH
                ));
            }
        }
        CampaignKind::Activation => {
            out.push_str(&format!("  {:>4}  {:<28}  {:>12}\n", "Rank", "Participant", "Total"));
            for e in entries {
                out.push_str(&format!(
                    "  {:>4}  {:<28}  {:>12}\n",
                    e.rank,
                    e.subject_key,
                    format_points(e.total_points)
                ));
            }
        }
    }
    out
}

// ── Progress cards ──

pub fn render_card(card: &ProgressCard) -> String {
    let deadline = match card.deadline {
        Deadline::EndsIn(days) => format!("  •  Ends in {days} days"),
        Deadline::Finished => "  •  Finished".to_string(),
        Deadline::Unknown => String::new(),
    };
    let mut out = format!("[{}] {}{}\n", card.kind, card.title, deadline);
    out.push_str(&format!(
        "  {} pts  {}  minimum {} pts\n",
        format_points(card.points),
        progress_bar(card.fraction),
        format_points(card.minimum_points),
    ));

    let message = match card.standing {
        Standing::Winning { rank, cap } => {
            format!("Congratulations! You are #{rank} (Top {cap}).")
        }
        Standing::Chasing {
            rank,
            cap,
            points_needed,
        } if (1..=cap).contains(&rank) => format!(
            "You are #{rank} but below the minimum. {} pts to qualify.",
            format_points(points_needed)
        ),
        Standing::Chasing {
            rank,
            cap,
            points_needed,
        } if rank > 0 => format!(
            "You are #{rank}. {} pts to reach the Top {cap}.",
            format_points(points_needed)
        ),
        Standing::Chasing {
            cap, points_needed, ..
        } => format!(
            "No sales ranked yet. {} pts to reach the Top {cap}.",
            format_points(points_needed)
        ),
        Standing::Open { .. } if card.meets_minimum => "Minimum reached.".to_string(),
        Standing::Open { points_needed } => {
            format!("{} pts to reach the minimum.", format_points(points_needed))
        }
    };
    out.push_str(&format!("  {message}\n"));
    out
}

// ── Season prizes ──

pub fn render_prize_progress(prize: &Prize, progress: &PrizeProgress) -> String {
    let state = if progress.achieved {
        "ACHIEVED".to_string()
    } else {
        format!("{} to go", format_points(progress.remaining))
    };
    let mut out = format!("[{}] {}  •  {}\n", prize.target_category, prize.title, state);
    if !prize.description.is_empty() {
        out.push_str(&format!("  {}\n", prize.description));
    }
    out.push_str(&format!(
        "  {} / {} pts  {}\n",
        format_points(progress.total_points),
        format_points(progress.target_points),
        progress_bar(progress.fraction),
    ));
    out
}

pub fn render_prize_winners(prize: &Prize, winners: &[LeaderboardEntry]) -> String {
    let mut out = format!(
        "=== [{}] {} ({}, {}) ===\n  Target {} pts\n",
        prize.target_category,
        prize.title,
        prize.season,
        prize.status,
        format_points(prize.target_points)
    );
    if winners.is_empty() {
        out.push_str("  Nobody has reached the target yet.\n");
        return out;
    }
    out.push_str(&format!("  {} reached the target\n", winners.len()));
    for e in winners {
        out.push_str(&format!(
            "  {:>4}  {:<28}  {:>12}\n",
            e.rank,
            e.subject_key,
            format_points(e.total_points)
        ));
    }
    out
}

// ── Season history ──

/// Per-season table, oldest first, followed by the evolution line.
pub fn render_history(seasons: &[SeasonSummary], evolution: Option<&SeasonEvolution>) -> String {
    let mut out = format!(
        "  {:<16}  {:>12}  {:>6}  {:>10}  {:>10}\n",
        "Season", "Points", "Sales", "Documents", "Average"
    );
    for s in seasons {
        out.push_str(&format!(
            "  {:<16}  {:>12}  {:>6}  {:>10}  {:>10}\n",
            s.season,
            format_points(s.points),
            s.sales,
            s.documents,
            format_points(s.average_points)
        ));
    }
    if let Some(evo) = evolution {
        out.push_str(&format!(
            "\n  {} vs {} (same months): {} vs {} pts  {}\n",
            evo.season,
            evo.previous_season,
            format_points(evo.points),
            format_points(evo.previous_points),
            format_evolution(evo.evolution)
        ));
    }
    out
}

/// `+25.0%`, `New`, or `-`.
pub fn format_evolution(evolution: Evolution) -> String {
    match evolution {
        Evolution::Change { fraction } => format!("{:+.1}%", fraction * 100.0),
        Evolution::New => "New".to_string(),
        Evolution::Flat => "-".to_string(),
    }
}

// ── Formatting ──

/// Round to whole points and group thousands with `.`: `1234567.6` → `1.234.568`.
pub fn format_points(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format a bare CPF (11 digits) or CNPJ (14 digits); anything else verbatim.
pub fn format_document(id: &str) -> String {
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        11 => format!(
            "{}.{}.{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..]
        ),
        14 => format!(
            "{}.{}.{}/{}-{}",
            &digits[..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..]
        ),
        _ => id.to_string(),
    }
}

/// Formatted documents joined with ` | `.
pub fn format_documents<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    ids.into_iter()
        .map(format_document)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn progress_bar(fraction: f64) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        fraction * 100.0
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
