//! Pipeline configuration

use crate::error::{LoanfundError, Result};
use crate::features::UnseenCategoryPolicy;
use crate::training::ModelKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration threaded through every pipeline stage.
///
/// Built once (defaults, JSON file, or CLI overrides) and then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seed shared by the splitter, fold shuffling and the tree ensembles
    pub seed: u64,

    /// Fraction of engineered rows withheld for final evaluation
    pub holdout_fraction: f64,

    /// Number of cross-validation folds
    pub cv_folds: usize,

    /// Shuffle rows before assigning folds
    pub shuffle_folds: bool,

    /// Use class-preserving folds instead of plain k-fold
    pub stratified_folds: bool,

    // Tree parameters
    /// Maximum depth for every tree-based model
    pub max_depth: usize,

    /// Number of trees in the forest and boosting rounds
    pub n_estimators: usize,

    /// Shrinkage for gradient boosting
    pub learning_rate: f64,

    // Logistic regression
    pub logistic_max_iter: usize,
    pub logistic_learning_rate: f64,
    /// L2 penalty
    pub logistic_alpha: f64,

    /// What to do with category values outside the fitted vocabulary
    pub unseen_category_policy: UnseenCategoryPolicy,

    /// Models compared by the pipeline, in report order
    pub models: Vec<ModelKind>,

    /// Training-set fractions for the learning curve (empty = skip)
    pub learning_curve_fractions: Vec<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            holdout_fraction: 0.1,
            cv_folds: 5,
            shuffle_folds: true,
            stratified_folds: false,
            max_depth: 5,
            n_estimators: 100,
            learning_rate: 0.1,
            logistic_max_iter: 1000,
            logistic_learning_rate: 0.1,
            logistic_alpha: 1e-4,
            unseen_category_policy: UnseenCategoryPolicy::Reject,
            models: ModelKind::all().to_vec(),
            learning_curve_fractions: vec![0.1, 0.325, 0.55, 0.775, 1.0],
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_holdout_fraction(mut self, fraction: f64) -> Self {
        self.holdout_fraction = fraction;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_stratified_folds(mut self, stratified: bool) -> Self {
        self.stratified_folds = stratified;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_unseen_category_policy(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.unseen_category_policy = policy;
        self
    }

    pub fn with_models(mut self, models: Vec<ModelKind>) -> Self {
        self.models = models;
        self
    }

    pub fn with_learning_curve_fractions(mut self, fractions: Vec<f64>) -> Self {
        self.learning_curve_fractions = fractions;
        self
    }

    /// Check parameter ranges before any stage runs
    pub fn validate(&self) -> Result<()> {
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return Err(invalid("holdout_fraction", self.holdout_fraction, "must be in (0, 1)"));
        }
        if self.cv_folds < 2 {
            return Err(invalid("cv_folds", self.cv_folds, "must be at least 2"));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth", self.max_depth, "must be positive"));
        }
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", self.n_estimators, "must be positive"));
        }
        if self.learning_rate <= 0.0 {
            return Err(invalid("learning_rate", self.learning_rate, "must be positive"));
        }
        if self.logistic_learning_rate <= 0.0 {
            return Err(invalid(
                "logistic_learning_rate",
                self.logistic_learning_rate,
                "must be positive",
            ));
        }
        if self.logistic_alpha < 0.0 {
            return Err(invalid("logistic_alpha", self.logistic_alpha, "must be non-negative"));
        }
        if self.models.is_empty() {
            return Err(LoanfundError::ConfigError("no models configured".to_string()));
        }
        if let Some(f) = self
            .learning_curve_fractions
            .iter()
            .find(|&&f| !(f > 0.0 && f <= 1.0))
        {
            return Err(invalid("learning_curve_fractions", f, "entries must be in (0, 1]"));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: impl ToString, reason: &str) -> LoanfundError {
    LoanfundError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
