//! Model training module
//!
//! Provides the binary classifiers compared by the pipeline:
//! - Logistic regression
//! - Decision trees and Random Forests
//! - Gradient boosting
//!
//! plus the train/holdout splitter and the cross-validation harness.

mod engine;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod random_forest;
pub mod split;

pub use cross_validation::{
    cross_validate, learning_curve, CVResults, CVSplit, CVStrategy, CrossValidator, LearningCurve,
    LearningCurvePoint,
};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{rank_features, Model, ModelKind};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use linear_models::LogisticRegression;
pub use models::{validate_binary_labels, Classifier};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::train_test_split;
