//! ROC curve and area under it

use crate::error::{LoanfundError, Result};
use crate::training::validate_binary_labels;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Receiver operating characteristic curve.
///
/// Point `i` is the (false positive rate, true positive rate) obtained by
/// calling every row with score `>= thresholds[i]` positive. The first point
/// is (0, 0) at a threshold above every score; the last is (1, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// Trapezoidal area under the curve
    pub fn auc(&self) -> f64 {
        trapezoid(&self.fpr, &self.tpr)
    }

    pub fn len(&self) -> usize {
        self.fpr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fpr.is_empty()
    }
}

fn check_inputs(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<()> {
    if y_true.len() != scores.len() {
        return Err(LoanfundError::ShapeError {
            expected: format!("{} scores", y_true.len()),
            actual: format!("{} scores", scores.len()),
        });
    }
    validate_binary_labels(y_true)?;
    if scores.iter().any(|s| s.is_nan()) {
        return Err(LoanfundError::ValidationError(
            "scores contain NaN".to_string(),
        ));
    }
    Ok(())
}

/// ROC curve over the distinct scores, in descending threshold order
pub fn roc_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<RocCurve> {
    check_inputs(y_true, scores)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let n_pos = y_true.iter().filter(|&&v| v == 1.0).count() as f64;
    let n_neg = y_true.len() as f64 - n_pos;

    let max_score = scores[order[0]];
    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thresholds = vec![max_score + 1.0];

    let (mut tp, mut fp) = (0.0, 0.0);
    for (pos, &i) in order.iter().enumerate() {
        if y_true[i] == 1.0 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        // Emit a point only once every row sharing this score is counted
        let last_of_score = order
            .get(pos + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if last_of_score {
            fpr.push(fp / n_neg);
            tpr.push(tp / n_pos);
            thresholds.push(scores[i]);
        }
    }

    Ok(RocCurve {
        fpr,
        tpr,
        thresholds,
    })
}

/// Probability that a random positive outscores a random negative, ties
/// counting one half. Equals the trapezoidal area under [`roc_curve`].
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    check_inputs(y_true, scores)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    // Average 1-based ranks over tied groups
    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let avg_rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg_rank;
        }
        start = end;
    }

    let n_pos = y_true.iter().filter(|&&v| v == 1.0).count() as f64;
    let n_neg = y_true.len() as f64 - n_pos;
    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y == 1.0)
        .map(|(_, &r)| r)
        .sum();

    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Trapezoidal rule over paired x/y samples
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}
