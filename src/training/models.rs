//! Classifier contract shared by every model

use crate::error::{LoanfundError, Result};
use crate::evaluation::accuracy;
use ndarray::{Array1, Array2};

/// Binary classifier over `f64` feature matrices with 0/1 labels.
///
/// The cross-validation harness and the evaluator only depend on this trait.
pub trait Classifier: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Class labels (0.0 / 1.0), thresholding probabilities at 0.5
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Accuracy on the given rows
    fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let y_pred = self.predict(x)?;
        accuracy(y, &y_pred)
    }

    /// Short human-readable model name
    fn name(&self) -> &'static str;
}

/// Check that `x` and `y` agree on row count and that there is at least one row
pub(crate) fn check_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(LoanfundError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(LoanfundError::ValidationError("no training rows".to_string()));
    }
    Ok(())
}

/// Labels must be 0.0 or 1.0
pub(crate) fn check_binary_values(y: &Array1<f64>) -> Result<()> {
    if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(LoanfundError::ValidationError(format!(
            "labels must be 0 or 1, found {}",
            bad
        )));
    }
    Ok(())
}

/// Labels must be 0/1 and contain both classes
pub fn validate_binary_labels(y: &Array1<f64>) -> Result<()> {
    check_binary_values(y)?;
    let positives = y.iter().filter(|&&v| v == 1.0).count();
    if positives == 0 || positives == y.len() {
        return Err(LoanfundError::ValidationError(
            "labels need at least two distinct values".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validate_binary_labels() {
        assert!(validate_binary_labels(&array![0.0, 1.0, 1.0]).is_ok());
        assert!(validate_binary_labels(&array![1.0, 1.0]).is_err());
        assert!(validate_binary_labels(&array![0.0, 2.0]).is_err());
    }

    #[test]
    fn test_check_shapes() {
        let x = Array2::<f64>::zeros((3, 2));
        assert!(check_shapes(&x, &array![0.0, 1.0, 0.0]).is_ok());
        assert!(matches!(
            check_shapes(&x, &array![0.0, 1.0]),
            Err(LoanfundError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
    }
}
