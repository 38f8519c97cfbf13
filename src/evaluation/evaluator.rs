//! Holdout evaluation

use super::metrics::{brier_score, ClassificationMetrics};
use super::roc::{roc_auc, roc_curve, RocCurve};
use crate::error::{LoanfundError, Result};
use crate::training::{validate_binary_labels, Classifier};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How one fitted model did on the holdout set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub model: String,
    pub n_train: usize,
    pub n_holdout: usize,
    pub roc: RocCurve,
    pub auc: f64,
    pub brier_score: f64,
    /// Metrics at the 0.5 probability threshold
    pub metrics: ClassificationMetrics,
}

/// Fit `model` on the full training set and score the holdout set.
///
/// The holdout must contain both classes, otherwise the ROC curve is
/// undefined; this is checked before any fitting happens.
pub fn evaluate<C: Classifier + ?Sized>(
    model: &mut C,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_holdout: &Array2<f64>,
    y_holdout: &Array1<f64>,
) -> Result<Evaluation> {
    if x_holdout.nrows() != y_holdout.len() {
        return Err(LoanfundError::ShapeError {
            expected: format!("y_holdout length = {}", x_holdout.nrows()),
            actual: format!("y_holdout length = {}", y_holdout.len()),
        });
    }
    validate_binary_labels(y_holdout).map_err(|_| {
        LoanfundError::ValidationError(
            "holdout set must contain both funded and unfunded loans".to_string(),
        )
    })?;

    model.fit(x_train, y_train)?;

    let proba = model.predict_proba(x_holdout)?;
    let roc = roc_curve(y_holdout, &proba)?;
    let auc = roc_auc(y_holdout, &proba)?;
    let y_pred = proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
    let metrics = ClassificationMetrics::compute(y_holdout, &y_pred)?;

    info!(
        model = model.name(),
        n_holdout = y_holdout.len(),
        auc,
        accuracy = metrics.accuracy,
        "Holdout evaluated"
    );

    Ok(Evaluation {
        model: model.name().to_string(),
        n_train: x_train.nrows(),
        n_holdout: y_holdout.len(),
        brier_score: brier_score(y_holdout, &proba)?,
        roc,
        auc,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::DecisionTree;
    use ndarray::array;

    #[test]
    fn test_evaluate_separable() {
        let x_train = array![[0.0], [1.0], [2.0], [8.0], [9.0], [10.0]];
        let y_train = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let x_holdout = array![[0.5], [9.5]];
        let y_holdout = array![0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        let eval = evaluate(&mut tree, &x_train, &y_train, &x_holdout, &y_holdout).unwrap();

        assert_eq!(eval.model, "Decision Tree");
        assert_eq!(eval.n_train, 6);
        assert_eq!(eval.n_holdout, 2);
        assert_eq!(eval.auc, 1.0);
        assert_eq!(eval.metrics.accuracy, 1.0);
        assert_eq!(eval.brier_score, 0.0);
    }

    #[test]
    fn test_single_class_holdout_rejected_before_fit() {
        let x_train = array![[0.0], [1.0]];
        let y_train = array![0.0, 1.0];
        let mut tree = DecisionTree::new_classifier();

        let result = evaluate(&mut tree, &x_train, &y_train, &array![[0.0]], &array![1.0]);
        assert!(matches!(result, Err(LoanfundError::ValidationError(_))));
        assert!(tree.predict_proba(&x_train).is_err());
    }
}
