use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::data::loader::load_file;
use crate::data::model::Dataset;
use crate::data::split::train_test_split;
use crate::metrics::ScoreReport;
use crate::plot::{importance, residuals};

// ---------------------------------------------------------------------------
// One run, top to bottom
// ---------------------------------------------------------------------------

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub train_rows: usize,
    pub test_rows: usize,
    pub scores: ScoreReport,
    pub outputs: Vec<PathBuf>,
}

/// Load → split → fit → score → importance chart → residual chart.
/// The first failure ends the run.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    // ---- Data ----
    let table = load_file(&config.input)
        .with_context(|| format!("loading {}", config.input.display()))?;
    let dataset = Dataset::from_table(table, &config.target)
        .with_context(|| format!("selecting target column '{}'", config.target))?;
    log::info!(
        "loaded {} rows, {} features, target '{}'",
        dataset.len(),
        dataset.feature_names().len(),
        dataset.target_name
    );

    let split = train_test_split(&dataset, config.test_fraction, config.seed)
        .context("splitting train/test")?;
    log::info!(
        "split {} train / {} test rows (seed {})",
        split.train.len(),
        split.test.len(),
        config.seed
    );

    // ---- Model ----
    let model = config
        .forest_params()
        .fit(&split.train.features, &split.train.target)
        .context("fitting random forest")?;
    log::info!("fitted {} trees", model.n_trees());

    // ---- Scores ----
    let scores = ScoreReport {
        train: model.score(&split.train.features, &split.train.target)?,
        test: model.score(&split.test.features, &split.test.target)?,
    };
    scores.write_to(&config.metrics_path)?;
    log::info!(
        "train R² {:.3}, test R² {:.3} → {}",
        scores.train,
        scores.test,
        config.metrics_path.display()
    );

    // ---- Feature importance ----
    let table = importance::importance_table(model.feature_names(), model.feature_importances());
    for row in &table {
        log::debug!("importance {:>24}: {:.4}", row.feature, row.importance);
    }
    importance::render(&table, &config.plot_style, &config.importance_path)
        .with_context(|| format!("rendering {}", config.importance_path.display()))?;
    log::info!("wrote {}", config.importance_path.display());

    // ---- Residuals ----
    let predicted = model.predict(&split.test.features)?;
    // Unseeded: the plot differs run to run even though the scores do not.
    let points = residuals::jittered_residuals(
        &split.test.target,
        &predicted,
        config.jitter_sigma,
        &mut rand::rng(),
    )
    .context("jittering residuals")?;
    residuals::render(
        &points,
        &dataset.target_name,
        &config.plot_style,
        &config.residuals_path,
    )
    .with_context(|| format!("rendering {}", config.residuals_path.display()))?;
    log::info!("wrote {}", config.residuals_path.display());

    Ok(RunSummary {
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        scores,
        outputs: vec![
            config.metrics_path.clone(),
            config.importance_path.clone(),
            config.residuals_path.clone(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::fs;
    use std::path::Path;

    use crate::data::DataError;
    use crate::forest::ForestError;

    fn config_in(dir: &Path, input: &str) -> PipelineConfig {
        PipelineConfig {
            input: dir.join(input),
            metrics_path: dir.join("metrics.txt"),
            importance_path: dir.join("feature_importance.png"),
            residuals_path: dir.join("residuals.png"),
            ..PipelineConfig::default()
        }
    }

    /// 100 rows, 5 features, integer `quality` driven mostly by f0 and f1.
    fn write_dataset(path: &Path) {
        let mut csv = String::from("f0,f1,f2,f3,f4,quality\n");
        for i in 0..100u64 {
            let f: Vec<f64> = (0..5u64)
                .map(|j| ((i * (31 + 17 * j) + 7 * j) % 97) as f64 / 97.0)
                .collect();
            let quality = (3.0 + 4.0 * f[0] + 2.0 * f[1]).round();
            writeln!(csv, "{},{},{},{},{},{quality}", f[0], f[1], f[2], f[3], f[4]).unwrap();
        }
        fs::write(path, csv).unwrap();
    }

    #[test]
    fn end_to_end_hundred_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("wine_quality.csv"));
        let config = config_in(dir.path(), "wine_quality.csv");

        let summary = run(&config).unwrap();
        assert_eq!(summary.train_rows, 80);
        assert_eq!(summary.test_rows, 20);
        assert!(summary.scores.train <= 1.0);
        assert!(summary.scores.test <= 1.0);

        let report = fs::read_to_string(&config.metrics_path).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        for (line, label) in lines.iter().zip(["Training Variance explained", "Test Variance explained"]) {
            let value = line
                .strip_prefix(label)
                .and_then(|rest| rest.strip_prefix(": "))
                .and_then(|rest| rest.strip_suffix('%'))
                .unwrap_or_else(|| panic!("bad report line: {line}"));
            value.parse::<f64>().unwrap();
        }

        for image in [&config.importance_path, &config.residuals_path] {
            assert!(fs::metadata(image).unwrap().len() > 0, "{}", image.display());
            image::open(image).unwrap();
        }
    }

    #[test]
    fn scores_are_reproducible_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("wine_quality.csv"));
        let config = config_in(dir.path(), "wine_quality.csv");

        let first = run(&config).unwrap();
        let report = fs::read_to_string(&config.metrics_path).unwrap();
        let second = run(&config).unwrap();
        assert_eq!(first.scores, second.scores);
        assert_eq!(report, fs::read_to_string(&config.metrics_path).unwrap());
    }

    #[test]
    fn missing_input_is_fatal_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), "absent.csv");

        let err = run(&config).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::NotFound { .. })));
        assert!(!config.metrics_path.exists());
    }

    #[test]
    fn non_numeric_feature_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wine_quality.csv"), "colour,quality\nred,5\nwhite,6\n").unwrap();
        let config = config_in(dir.path(), "wine_quality.csv");

        let err = run(&config).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::Parse { .. })));
    }

    #[test]
    fn target_only_input_fails_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wine_quality.csv"), "quality\n5\n6\n7\n5\n6\n").unwrap();
        let config = config_in(dir.path(), "wine_quality.csv");

        let err = run(&config).unwrap_err();
        assert!(matches!(err.downcast_ref::<ForestError>(), Some(ForestError::NoFeatures)));
        assert!(!config.metrics_path.exists());
        assert!(!config.importance_path.exists());
    }

    #[test]
    fn missing_target_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wine_quality.csv"), "a,b\n1,2\n3,4\n").unwrap();
        let config = config_in(dir.path(), "wine_quality.csv");

        let err = run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("'quality'"));
    }
}
