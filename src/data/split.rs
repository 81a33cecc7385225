use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::DataError;
use super::model::Dataset;

// ---------------------------------------------------------------------------
// Train / test partition
// ---------------------------------------------------------------------------

/// Two disjoint row partitions of one dataset.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
    /// Source row index of each training row.
    pub train_rows: Vec<usize>,
    /// Source row index of each held-out row.
    pub test_rows: Vec<usize>,
}

/// Shuffle rows with a seeded generator and hold out `test_fraction` of them.
///
/// The held-out size is `ceil(n * test_fraction)`; both sides must end up
/// non-empty. No stratification.
pub fn train_test_split(
    dataset: &Dataset,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, DataError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DataError::InvalidSplit(format!(
            "test fraction must lie in (0, 1), got {test_fraction}"
        )));
    }

    let n = dataset.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DataError::InvalidSplit(format!(
            "{n} rows with test fraction {test_fraction} leaves an empty partition"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let train_rows = order.split_off(n_test);
    let test_rows = order;

    Ok(TrainTestSplit {
        train: dataset.select_rows(&train_rows),
        test: dataset.select_rows(&test_rows),
        train_rows,
        test_rows,
    })
}
