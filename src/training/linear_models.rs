//! Linear models

use super::models::{check_shapes, sigmoid, validate_binary_labels, Classifier};
use crate::error::{LoanfundError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Logistic regression for binary classification.
///
/// Trained by full-batch gradient descent with an L2 penalty. Columns are
/// standardized with the training means and standard deviations, so raw
/// amounts and 0/1 indicators can be mixed without rescaling upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients (in standardized space)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    means: Option<Array1<f64>>,
    scales: Option<Array1<f64>>,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 1e-4,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            means: None,
            scales: None,
            n_iter: 0,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Iterations run by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    fn standardize(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(means), Some(scales)) = (&self.means, &self.scales) else {
            return Err(LoanfundError::ModelNotFitted);
        };
        if x.ncols() != means.len() {
            return Err(LoanfundError::ShapeError {
                expected: format!("{} features", means.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((x - means) / scales)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_shapes(x, y)?;
        validate_binary_labels(y)?;
        if self.learning_rate <= 0.0 {
            return Err(LoanfundError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();

        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        // Constant columns keep a unit scale so they standardize to zero
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let xs = (x - &means) / &scales;
        self.means = Some(means);
        self.scales = Some(scales);

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        let lr = self.learning_rate;
        let alpha = self.alpha;

        self.n_iter = 0;
        for _ in 0..self.max_iter {
            self.n_iter += 1;
            let predictions = (xs.dot(&weights) + bias).mapv(sigmoid);

            let errors = &predictions - y;
            let dw = (xs.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let Some(coefficients) = &self.coefficients else {
            return Err(LoanfundError::ModelNotFitted);
        };
        let intercept = self.intercept.unwrap_or(0.0);

        let xs = self.standardize(x)?;
        Ok((xs.dot(coefficients) + intercept).mapv(sigmoid))
    }

    fn name(&self) -> &'static str {
        "Logistic Regression"
    }
}
