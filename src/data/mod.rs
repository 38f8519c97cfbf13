//! Dataset loading
//!
//! Reads loan listing CSVs into polars frames and converts them into typed
//! [`LoanRecord`]s for the feature engineer.

pub mod loader;
pub mod record;

pub use loader::{DataLoader, DataSaver};
pub use record::{columns, DatasetSummary, LoanRecord, FUNDED_STATUS};
