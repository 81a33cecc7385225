use std::path::PathBuf;

use serde::Serialize;

use crate::forest::RandomForestParams;
use crate::plot::PlotStyle;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Every knob of a run. There is no CLI or environment layer: `main` uses
/// [`PipelineConfig::default`], tests override fields directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    /// Tabular input (`.csv`, `.json` or `.parquet`).
    pub input: PathBuf,
    /// Column popped from the table as the regression target.
    pub target: String,
    /// Seeds the split and the forest.
    pub seed: u64,
    /// Held-out share of the rows.
    pub test_fraction: f64,
    pub n_estimators: usize,
    pub max_depth: Option<u16>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Standard deviation of the residual-plot jitter.
    pub jitter_sigma: f64,
    pub metrics_path: PathBuf,
    pub importance_path: PathBuf,
    pub residuals_path: PathBuf,
    pub plot_style: PlotStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("./wine_quality.csv"),
            target: "quality".to_string(),
            seed: 42,
            test_fraction: 0.2,
            n_estimators: 100,
            max_depth: Some(2),
            min_samples_split: 2,
            min_samples_leaf: 1,
            jitter_sigma: 0.25,
            metrics_path: PathBuf::from("metrics.txt"),
            importance_path: PathBuf::from("feature_importance.png"),
            residuals_path: PathBuf::from("residuals.png"),
            plot_style: PlotStyle::default(),
        }
    }
}

impl PipelineConfig {
    /// Forest hyperparameters derived from this configuration.
    pub fn forest_params(&self) -> RandomForestParams {
        RandomForestParams::new(self.n_estimators)
            .max_depth(self.max_depth)
            .min_samples_split(self.min_samples_split)
            .min_samples_leaf(self.min_samples_leaf)
            .seed(self.seed)
    }
}
