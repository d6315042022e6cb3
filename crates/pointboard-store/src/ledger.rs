//! The transaction ledger: every point-earning sale, loaded once per run.

use std::collections::BTreeSet;
use std::path::Path;

use pointboard_core::coerce::{parse_date, parse_number};
use pointboard_core::tabular::LedgerColumns;
use pointboard_core::Transaction;
use tracing::{info, warn};

use crate::table::TextTable;
use crate::StoreError;

/// What happened to the ledger rows during loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub loaded: usize,
    /// Loaded, but without a usable date; they never fall in a window.
    pub undated: usize,
    /// Dropped: no subject key.
    pub skipped_keys: usize,
    /// Dropped: points missing, non-numeric, or non-finite.
    pub skipped_points: usize,
}

/// An immutable snapshot of the ledger.
pub struct Ledger {
    transactions: Vec<Transaction>,
    report: LoadReport,
}

impl Ledger {
    /// Load a ledger CSV using the given column names.
    pub fn open(path: &Path, columns: &LedgerColumns) -> Result<Self, StoreError> {
        let table = TextTable::open(path)?;
        Self::from_table(&table, columns)
    }

    pub fn from_table(table: &TextTable, columns: &LedgerColumns) -> Result<Self, StoreError> {
        let mut report = LoadReport::default();
        if table.is_empty() {
            return Ok(Self {
                transactions: Vec::new(),
                report,
            });
        }
        table.require(&columns.required())?;

        let mut transactions = Vec::with_capacity(table.num_rows());
        for row in table.rows() {
            report.rows += 1;

            let Some(subject_key) = row.get(&columns.subject_key) else {
                report.skipped_keys += 1;
                continue;
            };
            let Some(points) = row.get(&columns.points).and_then(parse_number) else {
                report.skipped_points += 1;
                continue;
            };
            let occurred_at = row.get(&columns.date).and_then(parse_date);
            if occurred_at.is_none() {
                report.undated += 1;
            }

            transactions.push(Transaction {
                occurred_at,
                points,
                subject_key: subject_key.to_string(),
                label: row.text(&columns.label),
                document_id: row.text(&columns.document_id),
                season: row.get(&columns.season).map(str::to_string),
            });
        }
        report.loaded = transactions.len();

        if report.skipped_keys > 0 || report.skipped_points > 0 {
            warn!(
                path = %table.path().display(),
                skipped_keys = report.skipped_keys,
                skipped_points = report.skipped_points,
                "dropped unusable ledger rows"
            );
        }
        info!(
            loaded = report.loaded,
            undated = report.undated,
            "loaded ledger"
        );
        Ok(Self {
            transactions,
            report,
        })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn report(&self) -> LoadReport {
        self.report
    }

    pub fn contains_subject(&self, subject_key: &str) -> bool {
        self.transactions.iter().any(|t| t.subject_key == subject_key)
    }

    /// Distinct documents consolidated under one subject.
    pub fn document_ids(&self, subject_key: &str) -> BTreeSet<&str> {
        self.transactions
            .iter()
            .filter(|t| t.subject_key == subject_key && !t.document_id.is_empty())
            .map(|t| t.document_id.as_str())
            .collect()
    }
}
