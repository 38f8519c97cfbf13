//! Model registry: which classifiers exist and how to build them

use super::decision_tree::DecisionTree;
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::linear_models::LogisticRegression;
use super::models::Classifier;
use super::random_forest::RandomForest;
use crate::config::PipelineConfig;
use crate::error::{LoanfundError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The classifier families the pipeline compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
}

impl ModelKind {
    /// Every kind, in report order
    pub fn all() -> [ModelKind; 4] {
        [
            ModelKind::LogisticRegression,
            ModelKind::DecisionTree,
            ModelKind::RandomForest,
            ModelKind::GradientBoosting,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
        }
    }

    /// Identifier accepted on the command line and in config files
    pub fn key(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = LoanfundError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "logistic_regression" | "logistic" | "lr" => Ok(ModelKind::LogisticRegression),
            "decision_tree" | "tree" | "dt" => Ok(ModelKind::DecisionTree),
            "random_forest" | "forest" | "rf" => Ok(ModelKind::RandomForest),
            "gradient_boosting" | "boosting" | "gb" | "gbm" => Ok(ModelKind::GradientBoosting),
            _ => Err(LoanfundError::ConfigError(format!(
                "unknown model '{}' (expected one of: {})",
                s,
                ModelKind::all().map(|k| k.key()).join(", ")
            ))),
        }
    }
}

/// A classifier of any supported kind, fitted or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Model {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
}

impl Model {
    /// Fresh, unfitted model of `kind` with hyperparameters from `config`
    pub fn build(kind: ModelKind, config: &PipelineConfig) -> Self {
        match kind {
            ModelKind::LogisticRegression => Model::LogisticRegression(
                LogisticRegression::new()
                    .with_alpha(config.logistic_alpha)
                    .with_max_iter(config.logistic_max_iter)
                    .with_learning_rate(config.logistic_learning_rate),
            ),
            ModelKind::DecisionTree => Model::DecisionTree(
                DecisionTree::new_classifier()
                    .with_max_depth(config.max_depth)
                    .with_random_state(config.seed),
            ),
            ModelKind::RandomForest => Model::RandomForest(
                RandomForest::new(config.n_estimators)
                    .with_max_depth(config.max_depth)
                    .with_random_state(config.seed),
            ),
            ModelKind::GradientBoosting => {
                Model::GradientBoosting(GradientBoostingClassifier::new(GradientBoostingConfig {
                    n_estimators: config.n_estimators,
                    learning_rate: config.learning_rate,
                    max_depth: config.max_depth,
                    random_state: Some(config.seed),
                    ..Default::default()
                }))
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Model::LogisticRegression(_) => ModelKind::LogisticRegression,
            Model::DecisionTree(_) => ModelKind::DecisionTree,
            Model::RandomForest(_) => ModelKind::RandomForest,
            Model::GradientBoosting(_) => ModelKind::GradientBoosting,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Model::LogisticRegression(m) => m,
            Model::DecisionTree(m) => m,
            Model::RandomForest(m) => m,
            Model::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Model::LogisticRegression(m) => m,
            Model::DecisionTree(m) => m,
            Model::RandomForest(m) => m,
            Model::GradientBoosting(m) => m,
        }
    }

    /// Per-feature importance, normalized for the tree models and absolute
    /// standardized coefficients for logistic regression. `None` before fitting.
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            Model::LogisticRegression(m) => m.coefficients.as_ref().map(|c| c.mapv(f64::abs)),
            Model::DecisionTree(m) => m.feature_importances().cloned(),
            Model::RandomForest(m) => m.feature_importances().cloned(),
            Model::GradientBoosting(m) => {
                let imp = m.feature_importances();
                (!imp.is_empty()).then(|| Array1::from_vec(imp.to_vec()))
            }
        }
    }
}

impl Classifier for Model {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict_proba(x)
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

/// Pair feature names with importances, highest first, keeping at most `k`
pub fn rank_features(names: &[String], importances: &Array1<f64>, k: usize) -> Vec<(String, f64)> {
    let mut pairs: Vec<(String, f64)> = names
        .iter()
        .zip(importances.iter())
        .map(|(name, &imp)| (name.clone(), imp))
        .collect();
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    pairs.truncate(k);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 5.0],
            [1.0, 4.0],
            [2.0, 5.0],
            [3.0, 4.0],
            [7.0, 5.0],
            [8.0, 4.0],
            [9.0, 5.0],
            [10.0, 4.0],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_parse_model_kind() {
        assert_eq!("rf".parse::<ModelKind>().unwrap(), ModelKind::RandomForest);
        assert_eq!(
            "Logistic-Regression".parse::<ModelKind>().unwrap(),
            ModelKind::LogisticRegression
        );
        assert_eq!("gradient_boosting".parse::<ModelKind>().unwrap(), ModelKind::GradientBoosting);
        assert!("svm".parse::<ModelKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_as_key() {
        for kind in ModelKind::all() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.key()));
        }
    }

    #[test]
    fn test_every_kind_fits_and_predicts() {
        let (x, y) = data();
        let config = PipelineConfig::default().with_n_estimators(10).with_max_depth(3);

        for kind in ModelKind::all() {
            let mut model = Model::build(kind, &config);
            assert_eq!(model.kind(), kind);
            assert_eq!(model.name(), kind.name());
            assert!(model.feature_importances().is_none());

            model.fit(&x, &y).unwrap();
            let proba = model.predict_proba(&x).unwrap();
            assert_eq!(proba.len(), 8);
            assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
            assert_eq!(model.feature_importances().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_model_serde_round_trip_keeps_predictions() {
        let (x, y) = data();
        let mut model = Model::build(ModelKind::DecisionTree, &PipelineConfig::default());
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.predict_proba(&x).unwrap(),
            model.predict_proba(&x).unwrap()
        );
    }

    #[test]
    fn test_rank_features() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = rank_features(&names, &array![0.2, 0.5, 0.3], 2);
        assert_eq!(ranked, vec![("b".to_string(), 0.5), ("c".to_string(), 0.3)]);
    }
}
