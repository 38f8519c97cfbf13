//! Model evaluation module
//!
//! Provides:
//! - Accuracy, precision, recall, F1 and Brier score
//! - ROC curves with rank-based and trapezoidal AUC
//! - Holdout evaluation of a fitted classifier

mod evaluator;
mod metrics;
mod roc;

pub use evaluator::{evaluate, Evaluation};
pub use metrics::{accuracy, brier_score, ClassificationMetrics, ConfusionMatrix};
pub use roc::{roc_auc, roc_curve, trapezoid, RocCurve};
