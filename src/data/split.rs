//! Seeded train/test split

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{HousingError, Result};

/// Rows on each side of a split
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// `(n_train, n_test)` for `n` rows: `n_train = floor(train_size * n)`
pub fn split_sizes(n_samples: usize, train_size: f64) -> Result<(usize, usize)> {
    if !(train_size > 0.0 && train_size < 1.0) {
        return Err(HousingError::InvalidParameter {
            name: "train_size".to_string(),
            value: train_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n_train = (train_size * n_samples as f64).floor() as usize;
    let n_test = n_samples - n_train;

    if n_train == 0 || n_test == 0 {
        return Err(HousingError::InvalidParameter {
            name: "train_size".to_string(),
            value: train_size.to_string(),
            reason: format!(
                "{} samples give {} train and {} test rows; both must be non-empty",
                n_samples, n_train, n_test
            ),
        });
    }

    Ok((n_train, n_test))
}

/// Shuffle rows with a ChaCha8 RNG seeded from `seed`, then take the first
/// `n_test` as the test set and the rest as the training set.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    train_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(HousingError::ShapeError {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }

    let (_, n_test) = split_sizes(n, train_size)?;

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let test_indices = permutation[..n_test].to_vec();
    let train_indices = permutation[n_test..].to_vec();

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &train_indices),
        x_test: x.select(Axis(0), &test_indices),
        y_train: y.select(Axis(0), &train_indices),
        y_test: y.select(Axis(0), &test_indices),
        train_indices,
        test_indices,
    })
}
