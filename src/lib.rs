//! Loanfund - Loan funding prediction
//!
//! This crate predicts whether a microfinance loan request will be funded:
//! - Feature engineering from raw listing records
//! - Holdout splitting and K-fold cross-validation
//! - Logistic regression, decision tree, random forest and gradient boosting
//! - ROC / AUC evaluation on the holdout set
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - CSV loading and typed loan records
//! - [`features`] - Derived features and categorical indicators
//!
//! ## Modelling
//! - [`training`] - Classifiers, splitting and cross-validation
//! - [`evaluation`] - Classification metrics, ROC curve and AUC
//! - [`pipeline`] - End-to-end model comparison and model bundles
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod data;
pub mod features;

// Modelling
pub mod training;
pub mod evaluation;
pub mod pipeline;

// Services
pub mod cli;

pub use error::{LoanfundError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{LoanfundError, Result};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Data
    pub use crate::data::{DataLoader, DataSaver, DatasetSummary, LoanRecord};

    // Features
    pub use crate::features::{FeatureEngineer, FeatureMatrix, UnseenCategoryPolicy};

    // Training
    pub use crate::training::{
        cross_validate, train_test_split, CVResults, CVStrategy, Classifier, CrossValidator,
        DecisionTree, GradientBoostingClassifier, GradientBoostingConfig, LogisticRegression,
        Model, ModelKind, RandomForest,
    };

    // Evaluation
    pub use crate::evaluation::{evaluate, roc_auc, roc_curve, Evaluation, RocCurve};

    // Pipeline
    pub use crate::pipeline::{ModelBundle, Pipeline, PipelineReport, Predictions};
}
