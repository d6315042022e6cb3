//! Storage layer: CSV ledger and catalogs read through Arrow.

mod error;
pub use error::StoreError;

pub mod catalog;
pub mod ledger;
pub mod table;

pub use catalog::{load_campaigns, load_prizes};
pub use ledger::{Ledger, LoadReport};
pub use table::TextTable;
