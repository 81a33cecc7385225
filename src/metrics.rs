use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Coefficient of determination
// ---------------------------------------------------------------------------

/// Fraction of the variance of `truth` explained by `predicted`.
///
/// Never above 1.0, negative when the predictions are worse than the mean.
/// A constant `truth` scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(truth: &[f64], predicted: &[f64]) -> f64 {
    debug_assert_eq!(truth.len(), predicted.len());
    let Some(&first) = truth.first() else {
        return 0.0;
    };
    if truth.iter().all(|&t| t == first) {
        let exact = truth.iter().zip(predicted).all(|(t, p)| t == p);
        return if exact { 1.0 } else { 0.0 };
    }
    smartcore::metrics::r2::<f64, Vec<f64>>(&truth.to_vec(), &predicted.to_vec())
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// Train and held-out scores, as fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreReport {
    pub train: f64,
    pub test: f64,
}

impl fmt::Display for ScoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Training Variance explained: {:.1}%", self.train * 100.0)?;
        writeln!(f, "Test Variance explained: {:.1}%", self.test * 100.0)
    }
}

impl ScoreReport {
    /// Overwrite `path` with the two-line report.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())
            .with_context(|| format!("writing metrics report to {}", path.display()))
    }
}
