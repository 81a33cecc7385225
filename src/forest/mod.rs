//! Random-forest regression on top of `smartcore`.
//!
//! ```text
//!  Table ──to_matrix──▶ DenseMatrix<f64>
//!                             │
//!  RandomForestParams ──fit──▶ RandomForestRegressor
//!                             ├─ predict / score (R²)
//!                             └─ feature_importances (permutation, seeded)
//! ```

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor as SmartForest, RandomForestRegressorParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;
use thiserror::Error;

use crate::data::model::Table;
use crate::metrics::r2_score;

/// Shuffles per feature when measuring permutation importance.
const PERMUTATION_REPEATS: usize = 5;

type Forest = SmartForest<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Error, PartialEq)]
pub enum ForestError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("cannot fit without feature columns")]
    NoFeatures,

    #[error("feature table has {features} rows but target has {target}")]
    LengthMismatch { features: usize, target: usize },

    #[error("a forest needs at least one tree")]
    NoEstimators,

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("model was fitted on {expected} features, got {found}")]
    FeatureCount { expected: usize, found: usize },

    #[error(transparent)]
    Backend(#[from] Failed),
}

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

/// Forest configuration, built fluently and consumed by [`RandomForestParams::fit`].
///
/// Every tree is grown on a bootstrap sample and considers every feature at
/// each split.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestParams {
    n_estimators: usize,
    max_depth: Option<u16>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    seed: u64,
}

impl RandomForestParams {
    /// `n_estimators` fully-grown trees; narrow with the setters.
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 0,
        }
    }

    pub fn max_depth(mut self, max_depth: Option<u16>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn backend_params(&self, n_features: usize) -> RandomForestRegressorParameters {
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_estimators)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_m(n_features)
            .with_seed(self.seed);
        match self.max_depth {
            Some(depth) => params.with_max_depth(depth),
            None => params,
        }
    }

    /// Fit the forest. Deterministic for a fixed seed.
    pub fn fit(&self, features: &Table, target: &[f64]) -> Result<RandomForestRegressor, ForestError> {
        let n = features.n_rows();
        if n == 0 {
            return Err(ForestError::EmptyTrainingSet);
        }
        if features.n_cols() == 0 {
            return Err(ForestError::NoFeatures);
        }
        if n != target.len() {
            return Err(ForestError::LengthMismatch {
                features: n,
                target: target.len(),
            });
        }
        if self.n_estimators == 0 {
            return Err(ForestError::NoEstimators);
        }
        if features.rows().flatten().any(|v| !v.is_finite()) {
            return Err(ForestError::NonFinite("features"));
        }
        if target.iter().any(|v| !v.is_finite()) {
            return Err(ForestError::NonFinite("target"));
        }

        let x = to_matrix(features)?;
        let y = target.to_vec();
        let forest = Forest::fit(&x, &y, self.backend_params(features.n_cols()))?;

        let mut model = RandomForestRegressor {
            forest,
            n_trees: self.n_estimators,
            feature_names: features.column_names().to_vec(),
            importances: Vec::new(),
        };
        model.importances = model.permutation_importances(features, target, self.seed)?;
        log::debug!(
            "fitted {} trees on {n} rows x {} features; importances {:?}",
            self.n_estimators,
            features.n_cols(),
            model.importances
        );
        Ok(model)
    }
}

fn to_matrix(table: &Table) -> Result<DenseMatrix<f64>, ForestError> {
    let values: Vec<f64> = table.rows().flatten().copied().collect();
    Ok(DenseMatrix::new(table.n_rows(), table.n_cols(), values, false)?)
}

// ---------------------------------------------------------------------------
// Fitted model
// ---------------------------------------------------------------------------

/// Immutable fitted ensemble.
#[derive(Debug)]
pub struct RandomForestRegressor {
    forest: Forest,
    n_trees: usize,
    feature_names: Vec<String>,
    importances: Vec<f64>,
}

impl RandomForestRegressor {
    /// Mean of the per-tree predictions for every row.
    pub fn predict(&self, features: &Table) -> Result<Vec<f64>, ForestError> {
        if features.n_cols() != self.feature_names.len() {
            return Err(ForestError::FeatureCount {
                expected: self.feature_names.len(),
                found: features.n_cols(),
            });
        }
        if features.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.forest.predict(&to_matrix(features)?)?)
    }

    /// Coefficient of determination of the predictions against `target`.
    pub fn score(&self, features: &Table, target: &[f64]) -> Result<f64, ForestError> {
        if features.n_rows() != target.len() {
            return Err(ForestError::LengthMismatch {
                features: features.n_rows(),
                target: target.len(),
            });
        }
        let predicted = self.predict(features)?;
        Ok(r2_score(target, &predicted))
    }

    /// One weight per training column, in training column order.
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Mean drop in training R² when one column is shuffled, floored at zero
    /// and normalised to sum to one. All zeros when no column matters.
    fn permutation_importances(
        &self,
        features: &Table,
        target: &[f64],
        seed: u64,
    ) -> Result<Vec<f64>, ForestError> {
        let baseline = self.score(features, target)?;
        let (n_rows, n_cols) = (features.n_rows(), features.n_cols());
        let original: Vec<f64> = features.rows().flatten().copied().collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..n_rows).collect();

        let mut drops = vec![0.0; n_cols];
        for (col, drop) in drops.iter_mut().enumerate() {
            let mut total = 0.0;
            for _ in 0..PERMUTATION_REPEATS {
                order.shuffle(&mut rng);
                let mut values = original.clone();
                for (row, &src) in order.iter().enumerate() {
                    values[row * n_cols + col] = original[src * n_cols + col];
                }
                let shuffled = DenseMatrix::new(n_rows, n_cols, values, false)?;
                let predicted = self.forest.predict(&shuffled)?;
                total += baseline - r2_score(target, &predicted);
            }
            *drop = (total / PERMUTATION_REPEATS as f64).max(0.0);
        }

        let sum: f64 = drops.iter().sum();
        if sum > 0.0 {
            drops.iter_mut().for_each(|d| *d /= sum);
        }
        Ok(drops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = 3·a + 2·b; c is pure noise from a fixed sequence.
    fn synthetic(n: usize) -> (Table, Vec<f64>) {
        let mut rows = Vec::with_capacity(n);
        let mut target = Vec::with_capacity(n);
        for i in 0..n {
            let a = (i % 17) as f64 / 17.0;
            let b = if i % 3 == 0 { 1.0 } else { 0.0 };
            let c = ((i * 7919) % 101) as f64 / 101.0;
            rows.push(vec![a, b, c]);
            target.push(3.0 * a + 2.0 * b);
        }
        let table = Table::from_rows(vec!["a".into(), "b".into(), "c".into()], rows).unwrap();
        (table, target)
    }

    fn params() -> RandomForestParams {
        RandomForestParams::new(100).max_depth(Some(2)).seed(42)
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let (x, y) = synthetic(120);
        let m1 = params().fit(&x, &y).unwrap();
        let m2 = params().fit(&x, &y).unwrap();
        assert_eq!(m1.predict(&x).unwrap(), m2.predict(&x).unwrap());
        assert_eq!(m1.feature_importances(), m2.feature_importances());
    }

    #[test]
    fn shallow_forest_explains_most_variance() {
        let (x, y) = synthetic(200);
        let model = params().fit(&x, &y).unwrap();
        let score = model.score(&x, &y).unwrap();
        assert!(score > 0.5 && score <= 1.0, "score {score}");
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn repeated_scoring_is_identical() {
        let (x, y) = synthetic(80);
        let model = params().fit(&x, &y).unwrap();
        let first = model.score(&x, &y).unwrap();
        for _ in 0..5 {
            assert_eq!(model.score(&x, &y).unwrap(), first);
        }
    }

    #[test]
    fn importances_sum_to_one_and_ignore_noise() {
        let (x, y) = synthetic(200);
        let model = params().fit(&x, &y).unwrap();
        let imp = model.feature_importances();
        assert_eq!(imp.len(), 3);
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp.iter().all(|&v| v >= 0.0));
        assert!(imp[0] > imp[2] && imp[1] > imp[2], "{imp:?}");
    }

    #[test]
    fn constant_target_yields_zero_importances() {
        let (x, _) = synthetic(30);
        let y = vec![5.0; 30];
        let model = params().fit(&x, &y).unwrap();
        assert!(model.feature_importances().iter().all(|&v| v == 0.0));
        assert!(model.predict(&x).unwrap().iter().all(|&p| (p - 5.0).abs() < 1e-9));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let (x, y) = synthetic(10);
        assert_eq!(
            params().fit(&x, &y[..9]).unwrap_err(),
            ForestError::LengthMismatch { features: 10, target: 9 }
        );
        assert_eq!(RandomForestParams::new(0).fit(&x, &y).unwrap_err(), ForestError::NoEstimators);

        let mut bad = y.clone();
        bad[3] = f64::NAN;
        assert_eq!(params().fit(&x, &bad).unwrap_err(), ForestError::NonFinite("target"));

        let empty = x.select_rows(&[]);
        assert_eq!(params().fit(&empty, &[]).unwrap_err(), ForestError::EmptyTrainingSet);
    }

    #[test]
    fn table_without_features_is_rejected() {
        let mut only_target =
            Table::from_rows(vec!["quality".into()], vec![vec![5.0], vec![6.0]]).unwrap();
        let y = only_target.pop_column("quality").unwrap();
        assert_eq!(params().fit(&only_target, &y).unwrap_err(), ForestError::NoFeatures);
    }

    #[test]
    fn predict_checks_feature_count() {
        let (x, y) = synthetic(20);
        let model = params().fit(&x, &y).unwrap();
        let mut narrow = x.clone();
        narrow.pop_column("c").unwrap();
        assert_eq!(
            model.predict(&narrow).unwrap_err(),
            ForestError::FeatureCount { expected: 3, found: 2 }
        );
    }

    #[test]
    fn unbounded_depth_fits_training_data_closely() {
        let (x, y) = synthetic(60);
        let deep = RandomForestParams::new(20).seed(7).fit(&x, &y).unwrap();
        let shallow = RandomForestParams::new(20).max_depth(Some(1)).seed(7).fit(&x, &y).unwrap();
        assert!(deep.score(&x, &y).unwrap() > shallow.score(&x, &y).unwrap());
    }
}
