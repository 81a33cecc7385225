//! Writes a synthetic red-wine-quality table so the report can run without
//! external data.
//!
//! Usage: `generate_sample [output.csv|output.parquet] [rows]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};

/// Physico-chemical features: (name, mean, std dev, lower bound).
const FEATURES: [(&str, f64, f64, f64); 11] = [
    ("fixed acidity", 8.32, 1.74, 4.6),
    ("volatile acidity", 0.53, 0.18, 0.12),
    ("citric acid", 0.27, 0.19, 0.0),
    ("residual sugar", 2.54, 1.41, 0.9),
    ("chlorides", 0.087, 0.047, 0.012),
    ("free sulfur dioxide", 15.9, 10.5, 1.0),
    ("total sulfur dioxide", 46.5, 32.9, 6.0),
    ("density", 0.9967, 0.0019, 0.990),
    ("pH", 3.31, 0.15, 2.74),
    ("sulphates", 0.66, 0.17, 0.33),
    ("alcohol", 10.4, 1.07, 8.4),
];

const DEFAULT_ROWS: usize = 1599;

/// Integer quality score 3..=8 driven mostly by alcohol, volatile acidity
/// and sulphates.
fn quality(row: &[f64], noise: f64) -> i64 {
    let volatile = row[1];
    let sulphates = row[9];
    let alcohol = row[10];
    let latent = 5.64 + 0.33 * (alcohol - 10.4) - 1.1 * (volatile - 0.53)
        + 0.9 * (sulphates - 0.66)
        + noise;
    latent.round().clamp(3.0, 8.0) as i64
}

fn generate(n_rows: usize, seed: u64) -> Result<(Vec<Vec<f64>>, Vec<i64>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let features = FEATURES
        .iter()
        .map(|&(_, mean, sd, floor)| Ok((Normal::new(mean, sd)?, floor)))
        .collect::<Result<Vec<(Normal<f64>, f64)>, NormalError>>()?;
    let quality_noise = Normal::new(0.0, 0.55)?;

    let mut rows = Vec::with_capacity(n_rows);
    let mut scores = Vec::with_capacity(n_rows);
    for _ in 0..n_rows {
        let row: Vec<f64> = features
            .iter()
            .map(|(dist, floor)| dist.sample(&mut rng).max(*floor))
            .collect();
        scores.push(quality(&row, quality_noise.sample(&mut rng)));
        rows.push(row);
    }
    Ok((rows, scores))
}

fn write_csv(path: &Path, rows: &[Vec<f64>], scores: &[i64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV output")?;
    let mut header: Vec<&str> = FEATURES.iter().map(|f| f.0).collect();
    header.push("quality");
    writer.write_record(&header)?;

    for (row, score) in rows.iter().zip(scores) {
        let mut record: Vec<String> = row.iter().map(|v| format!("{v:.4}")).collect();
        record.push(score.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[Vec<f64>], scores: &[i64]) -> Result<()> {
    let mut fields: Vec<Field> = FEATURES
        .iter()
        .map(|f| Field::new(f.0, DataType::Float64, false))
        .collect();
    fields.push(Field::new("quality", DataType::Int64, false));
    let schema = Arc::new(Schema::new(fields));

    let mut columns: Vec<ArrayRef> = (0..FEATURES.len())
        .map(|j| Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r[j]))) as ArrayRef)
        .collect();
    columns.push(Arc::new(Int64Array::from(scores.to_vec())));

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating parquet output")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("wine_quality.csv"));
    let n_rows = match args.next() {
        Some(n) => n.parse::<usize>().with_context(|| format!("row count '{n}'"))?,
        None => DEFAULT_ROWS,
    };

    let (rows, scores) = generate(n_rows, 42)?;

    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&output, &rows, &scores)?,
        "parquet" | "pq" => write_parquet(&output, &rows, &scores)?,
        other => bail!("Unsupported output extension: .{other}"),
    }

    log::info!("wrote {n_rows} rows to {}", output.display());
    println!(
        "Wrote {n_rows} samples ({} features + quality) to {}",
        FEATURES.len(),
        output.display()
    );
    Ok(())
}
