//! Train / holdout partitioning

use crate::error::{LoanfundError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Shuffle `0..n_rows` with a seeded generator and cut off a holdout.
///
/// The holdout takes `round(n_rows * test_fraction)` rows, clamped so both
/// sides keep at least one row. Returns `(train, holdout)`; the same seed
/// always yields the same partition.
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(LoanfundError::InvalidParameter {
            name: "test_fraction".to_string(),
            value: test_fraction.to_string(),
            reason: "must lie strictly between 0 and 1".to_string(),
        });
    }
    if n_rows < 2 {
        return Err(LoanfundError::ValidationError(format!(
            "need at least 2 rows to split, got {}",
            n_rows
        )));
    }

    let n_holdout = ((n_rows as f64) * test_fraction).round() as usize;
    let n_holdout = n_holdout.clamp(1, n_rows - 1);

    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let train = indices.split_off(n_holdout);
    debug!(n_train = train.len(), n_holdout = indices.len(), seed, "Split rows");
    Ok((train, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_and_disjointness() {
        let (train, holdout) = train_test_split(100, 0.1, 42).unwrap();
        assert_eq!(holdout.len(), 10);
        assert_eq!(train.len(), 90);

        let mut all: Vec<usize> = train.iter().chain(&holdout).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_reproducible() {
        assert_eq!(
            train_test_split(37, 0.25, 7).unwrap(),
            train_test_split(37, 0.25, 7).unwrap()
        );
        assert_ne!(
            train_test_split(37, 0.25, 7).unwrap(),
            train_test_split(37, 0.25, 8).unwrap()
        );
    }

    #[test]
    fn test_rounding_and_clamping() {
        // 15 * 0.1 = 1.5 rounds to 2
        assert_eq!(train_test_split(15, 0.1, 1).unwrap().1.len(), 2);
        // 3 * 0.1 = 0.3 would round to zero
        assert_eq!(train_test_split(3, 0.1, 1).unwrap().1.len(), 1);
        // 3 * 0.9 = 2.7 would leave no training rows
        assert_eq!(train_test_split(3, 0.9, 1).unwrap().0.len(), 1);
    }

    #[test]
    fn test_invalid_input() {
        assert!(train_test_split(10, 0.0, 1).is_err());
        assert!(train_test_split(10, 1.0, 1).is_err());
        assert!(train_test_split(1, 0.5, 1).is_err());
    }
}
