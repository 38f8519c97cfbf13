//! End-to-end pipeline: engineer, split, cross-validate, evaluate

use crate::config::PipelineConfig;
use crate::data::LoanRecord;
use crate::error::{LoanfundError, Result};
use crate::evaluation::{evaluate, Evaluation};
use crate::features::{FeatureEngineer, FeatureMatrix};
use crate::training::{
    cross_validate, learning_curve, rank_features, train_test_split, CVResults, CVStrategy,
    Classifier, CrossValidator, LearningCurve, Model, ModelKind,
};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Features kept per model in the report
const TOP_FEATURES: usize = 10;

/// Engineered data split into training and holdout sides
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Engineer fitted on every complete row, before splitting
    pub engineer: FeatureEngineer,
    pub train: FeatureMatrix,
    pub holdout: FeatureMatrix,
    pub summary: EngineeringSummary,
}

/// Row accounting from raw records to the two splits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeringSummary {
    pub n_records: usize,
    pub n_rows: usize,
    pub n_dropped: usize,
    pub n_features: usize,
    pub n_funded: usize,
    pub n_train: usize,
    pub n_holdout: usize,
}

/// Everything measured for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub kind: ModelKind,
    pub name: String,
    pub cv: CVResults,
    pub holdout: Evaluation,
    /// Most important features of the model fitted on the full training set
    pub top_features: Vec<(String, f64)>,
    pub learning_curve: Option<LearningCurve>,
    pub training_time_secs: f64,
}

/// Comparison of every configured model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub config: PipelineConfig,
    pub summary: EngineeringSummary,
    pub models: Vec<ModelReport>,
}

impl PipelineReport {
    /// Model with the highest holdout AUC
    pub fn best_by_auc(&self) -> Option<&ModelReport> {
        self.models
            .iter()
            .max_by(|a, b| a.holdout.auc.total_cmp(&b.holdout.auc))
    }

    /// Model with the highest mean cross-validated accuracy
    pub fn best_by_cv(&self) -> Option<&ModelReport> {
        self.models
            .iter()
            .max_by(|a, b| a.cv.mean_score.total_cmp(&b.cv.mean_score))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Runs the comparison for a fixed configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fold assignment configured for this pipeline
    pub fn cross_validator(&self) -> CrossValidator {
        let strategy = if self.config.stratified_folds {
            CVStrategy::StratifiedKFold {
                n_splits: self.config.cv_folds,
                shuffle: self.config.shuffle_folds,
            }
        } else {
            CVStrategy::KFold {
                n_splits: self.config.cv_folds,
                shuffle: self.config.shuffle_folds,
            }
        };
        CrossValidator::new(strategy).with_random_state(self.config.seed)
    }

    /// Engineer features from every record, then split off the holdout
    pub fn prepare(&self, records: &[LoanRecord]) -> Result<PreparedData> {
        let mut engineer = FeatureEngineer::new(self.config.unseen_category_policy);
        let features = engineer.fit_transform(records)?;

        let (train_idx, holdout_idx) = train_test_split(
            features.n_rows(),
            self.config.holdout_fraction,
            self.config.seed,
        )?;
        let train = features.select_rows(&train_idx);
        let holdout = features.select_rows(&holdout_idx);

        let summary = EngineeringSummary {
            n_records: records.len(),
            n_rows: features.n_rows(),
            n_dropped: features.n_dropped,
            n_features: features.n_features(),
            n_funded: features.n_positive(),
            n_train: train.n_rows(),
            n_holdout: holdout.n_rows(),
        };
        info!(
            rows = summary.n_rows,
            train = summary.n_train,
            holdout = summary.n_holdout,
            funded = summary.n_funded,
            "Prepared data"
        );

        Ok(PreparedData {
            engineer,
            train,
            holdout,
            summary,
        })
    }

    /// Cross-validate and holdout-evaluate every configured model
    pub fn run(&self, records: &[LoanRecord]) -> Result<PipelineReport> {
        let data = self.prepare(records)?;
        let models = self
            .config
            .models
            .iter()
            .map(|&kind| self.compare_one(kind, &data))
            .collect::<Result<Vec<_>>>()?;

        Ok(PipelineReport {
            config: self.config.clone(),
            summary: data.summary,
            models,
        })
    }

    /// Convenience wrapper reading records out of a loaded frame
    pub fn run_frame(&self, df: &DataFrame) -> Result<PipelineReport> {
        self.run(&LoanRecord::from_frame(df)?)
    }

    fn compare_one(&self, kind: ModelKind, data: &PreparedData) -> Result<ModelReport> {
        let start = Instant::now();
        let cv = self.cross_validator();
        let (x, y) = (&data.train.x, &data.train.y);

        let cv_results = cross_validate(|| Model::build(kind, &self.config), x, y, &cv)?;

        let mut model = Model::build(kind, &self.config);
        let holdout = evaluate(&mut model, x, y, &data.holdout.x, &data.holdout.y)?;

        let top_features = model
            .feature_importances()
            .map(|imp| rank_features(&data.train.feature_names, &imp, TOP_FEATURES))
            .unwrap_or_default();

        let curve = if self.config.learning_curve_fractions.is_empty() {
            None
        } else {
            Some(learning_curve(
                || Model::build(kind, &self.config),
                x,
                y,
                &cv,
                &self.config.learning_curve_fractions,
            )?)
        };

        let training_time_secs = start.elapsed().as_secs_f64();
        info!(
            model = kind.name(),
            cv_mean = cv_results.mean_score,
            auc = holdout.auc,
            secs = training_time_secs,
            "Model compared"
        );

        Ok(ModelReport {
            kind,
            name: kind.name().to_string(),
            cv: cv_results,
            holdout,
            top_features,
            learning_curve: curve,
            training_time_secs,
        })
    }

    /// Train one model on the training split and package it for scoring.
    ///
    /// The bundle carries the holdout evaluation of that same fitted model.
    pub fn train(&self, records: &[LoanRecord], kind: ModelKind) -> Result<ModelBundle> {
        let data = self.prepare(records)?;
        let mut model = Model::build(kind, &self.config);
        let evaluation = evaluate(
            &mut model,
            &data.train.x,
            &data.train.y,
            &data.holdout.x,
            &data.holdout.y,
        )?;

        Ok(ModelBundle {
            feature_names: data.train.feature_names.clone(),
            engineer: data.engineer,
            model,
            config: self.config.clone(),
            evaluation: Some(evaluation),
        })
    }
}

/// A fitted model together with the feature vocabulary it was trained on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub engineer: FeatureEngineer,
    pub model: Model,
    pub feature_names: Vec<String>,
    pub config: PipelineConfig,
    pub evaluation: Option<Evaluation>,
}

/// Scores for records that survived feature engineering
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub ids: Vec<i64>,
    pub probabilities: Array1<f64>,
    /// Records dropped for missing required fields
    pub n_dropped: usize,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `LOAN_ID`, `funded_probability` and `predicted_funded` (0/1) columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let labels: Vec<i32> = self
            .probabilities
            .iter()
            .map(|&p| i32::from(p >= 0.5))
            .collect();
        let df = DataFrame::new(vec![
            Column::new(crate::data::columns::LOAN_ID.into(), self.ids.as_slice()),
            Column::new("funded_probability".into(), self.probabilities.to_vec()),
            Column::new("predicted_funded".into(), labels),
        ])?;
        Ok(df)
    }
}

impl ModelBundle {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), model = self.model.name(), "Saved model bundle");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let bundle: Self = serde_json::from_str(&json)?;
        let names = bundle.engineer.feature_names()?;
        if names != bundle.feature_names {
            return Err(LoanfundError::SerializationError(
                "bundle vocabulary does not match its feature names".to_string(),
            ));
        }
        Ok(bundle)
    }

    /// Score records with the stored vocabulary; status is not required
    pub fn predict(&self, records: &[LoanRecord]) -> Result<Predictions> {
        let features = self.engineer.transform_unlabeled(records)?;
        let probabilities = if features.n_rows() == 0 {
            Array1::zeros(0)
        } else {
            self.model.predict_proba(&features.x)?
        };
        Ok(Predictions {
            ids: features.ids,
            probabilities,
            n_dropped: features.n_dropped,
        })
    }

    /// Score a loaded frame; the `STATUS` column may be absent
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Predictions> {
        self.predict(&LoanRecord::from_frame_unlabeled(df)?)
    }
}
