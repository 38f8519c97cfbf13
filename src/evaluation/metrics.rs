//! Classification metrics

use crate::error::{LoanfundError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

fn check_lengths(y_true: &Array1<f64>, other: &Array1<f64>) -> Result<()> {
    if y_true.len() != other.len() {
        return Err(LoanfundError::ShapeError {
            expected: format!("length {}", y_true.len()),
            actual: format!("length {}", other.len()),
        });
    }
    if y_true.is_empty() {
        return Err(LoanfundError::ValidationError(
            "cannot score an empty set".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of rows whose predicted label matches the true label
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Brier score: mean squared distance between probability and label
pub fn brier_score(y_true: &Array1<f64>, probs: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, probs)?;
    let total: f64 = probs
        .iter()
        .zip(y_true.iter())
        .map(|(&p, &y)| (p - y).powi(2))
        .sum();
    Ok(total / probs.len() as f64)
}

/// Counts of a binary confusion matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => cm.true_positives += 1,
                (false, true) => cm.false_positives += 1,
                (false, false) => cm.true_negatives += 1,
                (true, false) => cm.false_negatives += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Threshold metrics for one set of hard predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    /// 0 when nothing was predicted positive
    pub precision: f64,
    /// 0 when there are no positives
    pub recall: f64,
    pub f1_score: f64,
    pub confusion: ConfusionMatrix,
    pub n_samples: usize,
}

impl ClassificationMetrics {
    /// Compute classification metrics
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        let confusion = ConfusionMatrix::from_labels(y_true, y_pred)?;
        let tp = confusion.true_positives as f64;
        let fp = confusion.false_positives as f64;
        let fn_ = confusion.false_negatives as f64;

        let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
        let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self {
            accuracy: (tp + confusion.true_negatives as f64) / confusion.total() as f64,
            precision,
            recall,
            f1_score,
            confusion,
            n_samples: confusion.total(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let y = array![1.0, 0.0, 1.0, 0.0];
        assert_eq!(accuracy(&y, &array![1.0, 0.0, 0.0, 0.0]).unwrap(), 0.75);
        assert!(accuracy(&y, &array![1.0]).is_err());
        assert!(accuracy(&array![], &array![]).is_err());
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 1.0, 0.0];
        let m = ClassificationMetrics::compute(&y_true, &y_pred).unwrap();

        assert_eq!(
            m.confusion,
            ConfusionMatrix {
                true_positives: 2,
                false_positives: 1,
                true_negatives: 1,
                false_negatives: 1,
            }
        );
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_positive_predictions() {
        let m = ClassificationMetrics::compute(&array![1.0, 0.0], &array![0.0, 0.0]).unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1_score, 0.0);
    }

    #[test]
    fn test_brier_score() {
        let score = brier_score(&array![1.0, 0.0], &array![0.5, 0.5]).unwrap();
        assert!((score - 0.25).abs() < 1e-12);
    }
}
