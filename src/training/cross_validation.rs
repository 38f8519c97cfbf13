//! Cross-validation

use super::models::{validate_binary_labels, Classifier};
use crate::error::{LoanfundError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Cross-validation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::KFold {
            n_splits: 5,
            shuffle: true,
        }
    }
}

impl CVStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => {
                *n_splits
            }
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn strategy(&self) -> &CVStrategy {
        &self.strategy
    }

    /// Generate train/test splits.
    ///
    /// Fails when fewer than two folds are requested or when a fold would
    /// be empty. Stratification needs `y`.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        let n_splits = self.strategy.n_splits();
        if n_splits < 2 {
            return Err(LoanfundError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(LoanfundError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        match &self.strategy {
            CVStrategy::KFold { shuffle, .. } => Ok(self.k_fold_split(n_samples, n_splits, *shuffle)),
            CVStrategy::StratifiedKFold { shuffle, .. } => {
                let y = y.ok_or_else(|| {
                    LoanfundError::ValidationError(
                        "StratifiedKFold requires target array".to_string(),
                    )
                })?;
                if y.len() != n_samples {
                    return Err(LoanfundError::ShapeError {
                        expected: format!("y length = {}", n_samples),
                        actual: format!("y length = {}", y.len()),
                    });
                }
                Ok(self.stratified_k_fold_split(y, n_splits, *shuffle))
            }
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn k_fold_split(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Vec<CVSplit> {
        let mut indices: Vec<usize> = (0..n_samples).collect();

        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        splits
    }

    fn stratified_k_fold_split(&self, y: &Array1<f64>, n_splits: usize, shuffle: bool) -> Vec<CVSplit> {
        // Ordered map keeps the class visiting order stable across runs
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if shuffle {
            let mut rng = self.rng();
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal round-robin, continuing where the previous class stopped,
        // so fold sizes still differ by at most one
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut next = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[next % n_splits].push(idx);
                next += 1;
            }
        }

        (0..n_splits)
            .map(|fold_idx| CVSplit {
                test_indices: folds[fold_idx].clone(),
                train_indices: folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect(),
                fold_idx,
            })
            .collect()
    }
}

/// Cross-validation results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Population standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let (mean_score, std_score) = mean_std(&scores);
        Self {
            n_folds: scores.len(),
            scores,
            mean_score,
            std_score,
        }
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Score a fresh model on every fold.
///
/// `make_model` is called once per fold so no state leaks between folds.
/// A fold's score is the fraction of its rows predicted correctly.
pub fn cross_validate<C, F>(
    make_model: F,
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &CrossValidator,
) -> Result<CVResults>
where
    C: Classifier,
    F: Fn() -> C,
{
    if x.nrows() != y.len() {
        return Err(LoanfundError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    validate_binary_labels(y)?;

    let splits = cv.split(x.nrows(), Some(y))?;
    let mut scores = Vec::with_capacity(splits.len());
    let mut model_name = "";

    for split in &splits {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut model = make_model();
        model_name = model.name();
        model.fit(&x_train, &y_train).map_err(|e| {
            LoanfundError::TrainingError(format!("fold {}: {}", split.fold_idx, e))
        })?;
        let score = model.score(&x_test, &y_test)?;

        debug!(
            model = model_name,
            fold = split.fold_idx,
            n_train = split.train_indices.len(),
            n_test = split.test_indices.len(),
            score,
            "Fold scored"
        );
        scores.push(score);
    }

    let results = CVResults::from_scores(scores);
    info!(
        model = model_name,
        folds = results.n_folds,
        mean = results.mean_score,
        std = results.std_score,
        "Cross-validation finished"
    );
    Ok(results)
}

/// One training-set size on a learning curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurvePoint {
    /// Requested share of each fold's training rows
    pub fraction: f64,
    /// Training rows used per fold (largest fold)
    pub n_train: usize,
    /// Folds that contributed; folds whose subset held a single class are skipped
    pub n_folds: usize,
    pub train_mean: f64,
    pub train_std: f64,
    pub test_mean: f64,
    pub test_std: f64,
}

/// Cross-validated train/test accuracy at increasing training-set sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    pub model: String,
    pub points: Vec<LearningCurvePoint>,
}

/// Compute a learning curve.
///
/// For every fraction, each fold trains on the leading share of its training
/// indices and is scored on both that subset and the fold's test rows.
/// Sizes at which no fold sees both classes are left out of the curve.
pub fn learning_curve<C, F>(
    make_model: F,
    x: &Array2<f64>,
    y: &Array1<f64>,
    cv: &CrossValidator,
    train_fractions: &[f64],
) -> Result<LearningCurve>
where
    C: Classifier,
    F: Fn() -> C,
{
    if let Some(bad) = train_fractions.iter().find(|&&f| !(f > 0.0 && f <= 1.0)) {
        return Err(LoanfundError::InvalidParameter {
            name: "train_fractions".to_string(),
            value: bad.to_string(),
            reason: "must lie in (0, 1]".to_string(),
        });
    }
    if x.nrows() != y.len() {
        return Err(LoanfundError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    validate_binary_labels(y)?;

    let splits = cv.split(x.nrows(), Some(y))?;
    let mut points = Vec::with_capacity(train_fractions.len());
    let mut model_name = "";

    for &fraction in train_fractions {
        let mut train_scores = Vec::with_capacity(splits.len());
        let mut test_scores = Vec::with_capacity(splits.len());
        let mut n_train = 0;

        for split in &splits {
            let take = ((split.train_indices.len() as f64) * fraction).ceil() as usize;
            let subset = &split.train_indices[..take.clamp(1, split.train_indices.len())];
            let y_train = y.select(Axis(0), subset);
            if validate_binary_labels(&y_train).is_err() {
                debug!(fraction, fold = split.fold_idx, "Skipped single-class training subset");
                continue;
            }
            let x_train = x.select(Axis(0), subset);
            let x_test = x.select(Axis(0), &split.test_indices);
            let y_test = y.select(Axis(0), &split.test_indices);

            let mut model = make_model();
            model_name = model.name();
            model.fit(&x_train, &y_train)?;
            train_scores.push(model.score(&x_train, &y_train)?);
            test_scores.push(model.score(&x_test, &y_test)?);
            n_train = n_train.max(subset.len());
        }

        if test_scores.is_empty() {
            warn!(fraction, "No fold had both classes, size left off the curve");
            continue;
        }

        let (train_mean, train_std) = mean_std(&train_scores);
        let (test_mean, test_std) = mean_std(&test_scores);
        points.push(LearningCurvePoint {
            fraction,
            n_train,
            n_folds: test_scores.len(),
            train_mean,
            train_std,
            test_mean,
            test_std,
        });
    }

    info!(model = model_name, sizes = points.len(), "Learning curve computed");
    Ok(LearningCurve {
        model: model_name.to_string(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::DecisionTree;

    fn kfold(n_splits: usize, shuffle: bool) -> CrossValidator {
        CrossValidator::new(CVStrategy::KFold { n_splits, shuffle }).with_random_state(42)
    }

    fn toy_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * (j + 1)) as f64);
        let y = Array1::from_shape_fn(n, |i| if i % 5 == 0 { 1.0 } else { 0.0 });
        (x, y)
    }

    #[test]
    fn test_k_fold() {
        let splits = kfold(5, false).split(100, None).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_uneven_sizes_differ_by_one() {
        let splits = kfold(4, true).split(10, None).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
        assert_eq!(sizes.iter().sum::<usize>(), 10);
    }

    #[test]
    fn test_k_fold_seeded_shuffle_is_reproducible() {
        let a = kfold(5, true).split(50, None).unwrap();
        let b = kfold(5, true).split(50, None).unwrap();
        for (sa, sb) in a.iter().zip(&b) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
        // Shuffling actually moved rows
        assert_ne!(a[0].test_indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_fold_counts() {
        assert!(kfold(1, false).split(10, None).is_err());
        assert!(kfold(11, false).split(10, None).is_err());
        assert!(kfold(10, false).split(10, None).is_ok());
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);

        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: false,
        });
        let splits = cv.split(10, Some(&y)).unwrap();

        assert_eq!(splits.len(), 5);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 2);
            let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(positives, 1);
        }
    }

    #[test]
    fn test_stratified_requires_target() {
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: 2,
            shuffle: true,
        });
        assert!(cv.split(10, None).is_err());
    }

    #[test]
    fn test_cv_results_population_std() {
        let results = CVResults::from_scores(vec![0.5, 1.0]);
        assert_eq!(results.n_folds, 2);
        assert!((results.mean_score - 0.75).abs() < 1e-12);
        assert!((results.std_score - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_cross_validate_scores_every_fold() {
        let (x, y) = toy_data(50);
        let results = cross_validate(
            || DecisionTree::new_classifier().with_max_depth(3),
            &x,
            &y,
            &kfold(5, true),
        )
        .unwrap();

        assert_eq!(results.n_folds, 5);
        assert!(results.scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!((0.0..=1.0).contains(&results.mean_score));
    }

    #[test]
    fn test_cross_validate_rejects_single_class() {
        let x = Array2::zeros((10, 2));
        let y = Array1::zeros(10);
        let err = cross_validate(DecisionTree::new_classifier, &x, &y, &kfold(2, false));
        assert!(matches!(err, Err(LoanfundError::ValidationError(_))));
    }

    #[test]
    fn test_learning_curve_points() {
        let (x, y) = toy_data(60);
        let curve = learning_curve(
            || DecisionTree::new_classifier().with_max_depth(2),
            &x,
            &y,
            &CrossValidator::new(CVStrategy::StratifiedKFold {
                n_splits: 3,
                shuffle: true,
            })
            .with_random_state(1),
            &[0.5, 1.0],
        )
        .unwrap();

        assert_eq!(curve.model, "Decision Tree");
        assert_eq!(curve.points.len(), 2);
        assert_eq!(curve.points[1].n_train, 40);
        assert!(curve.points[0].n_train < curve.points[1].n_train);
        for point in &curve.points {
            assert!((0.0..=1.0).contains(&point.test_mean));
            assert!((0.0..=1.0).contains(&point.train_mean));
        }
    }

    #[test]
    fn test_learning_curve_rejects_bad_fraction() {
        let (x, y) = toy_data(20);
        let result = learning_curve(DecisionTree::new_classifier, &x, &y, &kfold(2, false), &[0.0]);
        assert!(matches!(result, Err(LoanfundError::InvalidParameter { .. })));
    }
}
