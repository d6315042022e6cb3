//! Campaign, activation, and season prize catalogs.
//!
//! A catalog file that does not exist yet is an empty catalog: the admin
//! pages create it on first save.

use std::path::Path;

use pointboard_core::coerce::parse_number;
use pointboard_core::record::ALL_CATEGORIES;
use pointboard_core::tabular::{campaign, prize};
use pointboard_core::{Campaign, CampaignKind, Prize, SpecFields, Status};
use tracing::{debug, warn};

use crate::table::{Row, TextTable};
use crate::StoreError;

/// Load campaigns or activations from `path`.
pub fn load_campaigns(path: &Path, kind: CampaignKind) -> Result<Vec<Campaign>, StoreError> {
    let Some(table) = open_catalog(path)? else {
        return Ok(Vec::new());
    };
    if table.is_empty() {
        return Ok(Vec::new());
    }
    table.require(campaign::REQUIRED)?;

    Ok(table.rows().map(|row| campaign_from_row(&row, kind)).collect())
}

fn campaign_from_row(row: &Row<'_>, kind: CampaignKind) -> Campaign {
    let owned = |column: &str| row.get(column).map(str::to_string);
    Campaign {
        title: row.text(campaign::TITLE),
        prize: row.text(campaign::PRIZE),
        description: row.text(campaign::DESCRIPTION),
        status: Status::parse(row.get(campaign::STATUS)),
        kind,
        fields: SpecFields {
            start: owned(campaign::START),
            end: owned(campaign::END),
            minimum: owned(campaign::MINIMUM),
            bonus_pct: owned(campaign::BONUS_PCT),
            winner_cap: owned(campaign::WINNER_CAP),
        },
    }
}

/// Load season prizes from `path`. Rows without a numeric target are skipped.
pub fn load_prizes(path: &Path) -> Result<Vec<Prize>, StoreError> {
    let Some(table) = open_catalog(path)? else {
        return Ok(Vec::new());
    };
    if table.is_empty() {
        return Ok(Vec::new());
    }
    table.require(prize::REQUIRED)?;

    let mut prizes = Vec::with_capacity(table.num_rows());
    for row in table.rows() {
        let title = row.text(prize::TITLE);
        let Some(target_points) = row.get(prize::TARGET).and_then(parse_number) else {
            warn!(title = %title, "skipping prize without a numeric target");
            continue;
        };
        prizes.push(Prize {
            title,
            target_points,
            season: row.text(prize::SEASON),
            description: row.text(prize::DESCRIPTION),
            status: Status::parse(row.get(prize::STATUS)),
            target_category: row
                .get(prize::CATEGORY)
                .unwrap_or(ALL_CATEGORIES)
                .to_string(),
        });
    }
    Ok(prizes)
}

fn open_catalog(path: &Path) -> Result<Option<TextTable>, StoreError> {
    match TextTable::open(path) {
        Ok(table) => Ok(Some(table)),
        Err(StoreError::FileNotFound(_)) => {
            debug!(path = %path.display(), "catalog file absent, treating as empty");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
