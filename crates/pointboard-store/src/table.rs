//! Flat CSV tables read through the Arrow CSV reader.
//!
//! Headers are taken from the file, then every column is decoded as nullable
//! `Utf8`. Typed coercion is left to the record mappers so one bad cell
//! never fails the file.

use std::fs::File;
use std::io::Seek;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use pointboard_core::tabular::text_schema;
use tracing::info;

use crate::StoreError;

/// Rows sampled to discover the header. Only names are used, not types.
const HEADER_SAMPLE: usize = 1;

/// An in-memory CSV table with all-text columns.
pub struct TextTable {
    path: PathBuf,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl TextTable {
    /// Read a CSV file with a header row.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::FileNotFound(path.to_path_buf()));
        }
        let mut file = File::open(path)?;
        let format = Format::default().with_header(true);
        let (inferred, _) = format.infer_schema(&mut file, Some(HEADER_SAMPLE))?;

        let schema = Arc::new(text_schema(
            inferred
                .fields()
                .iter()
                .map(|f| f.name().trim_start_matches('\u{feff}').trim()),
        ));
        if schema.fields().is_empty() {
            return Ok(Self {
                path: path.to_path_buf(),
                schema,
                batches: Vec::new(),
            });
        }

        file.rewind()?;
        let reader = ReaderBuilder::new(Arc::clone(&schema))
            .with_header(true)
            .build(file)?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;

        let table = Self {
            path: path.to_path_buf(),
            schema,
            batches,
        };
        info!(
            path = %path.display(),
            columns = table.schema.fields().len(),
            rows = table.num_rows(),
            "loaded table"
        );
        Ok(table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }

    /// Fail with [`StoreError::MissingColumn`] on the first absent column.
    pub fn require(&self, columns: &[&str]) -> Result<(), StoreError> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(column) => Err(StoreError::MissingColumn {
                file: self.path.clone(),
                column: column.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// A header-only or empty file.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.batches
            .iter()
            .flat_map(|batch| (0..batch.num_rows()).map(move |index| Row { batch, index }))
    }
}

/// One row of a [`TextTable`].
#[derive(Clone, Copy)]
pub struct Row<'a> {
    batch: &'a RecordBatch,
    index: usize,
}

impl<'a> Row<'a> {
    /// Trimmed cell text; `None` for absent columns, nulls, and blank cells.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let col = self.batch.column_by_name(column)?;
        let strings = col.as_any().downcast_ref::<StringArray>()?;
        if strings.is_null(self.index) {
            return None;
        }
        let value = strings.value(self.index).trim();
        (!value.is_empty()).then_some(value)
    }

    /// Cell text or an empty string.
    pub fn text(&self, column: &str) -> String {
        self.get(column).unwrap_or_default().to_string()
    }
}
