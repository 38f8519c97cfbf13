//! Feature engineering
//!
//! Derives the funding label, temporal features, fixed borrower/currency
//! flags and one-hot indicators from [`LoanRecord`](crate::data::LoanRecord)s.

mod engineer;
pub mod timestamps;
mod vocabulary;

pub use engineer::{FeatureEngineer, FeatureMatrix, FLAG_FEATURES, LABEL_COLUMN, NUMERIC_FEATURES};
pub use vocabulary::{CategoryGroup, FeatureVocabulary, UnseenCategoryPolicy};
