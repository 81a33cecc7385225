use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::DataError;
use super::model::Table;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a numeric table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, comma-delimited, every cell numeric
/// * `.json`    – `[{ "col": 1.0, ... }, ...]` (records orientation)
/// * `.parquet` – flat Float64 / Float32 / Int64 / Int32 columns
pub fn load_file(path: &Path) -> Result<Table, DataError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }?;

    if table.is_empty() {
        return Err(DataError::Empty);
    }
    log::debug!(
        "loaded {} rows x {} columns from {}",
        table.n_rows(),
        table.n_cols(),
        path.display()
    );
    Ok(table)
}

fn open(path: &Path) -> Result<File, DataError> {
    File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => DataError::NotFound {
            path: path.to_path_buf(),
        },
        _ => DataError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one observation per line.
/// Cells are parsed as `f64`; an empty or non-numeric cell is a parse error.
fn load_csv(path: &Path) -> Result<Table, DataError> {
    let mut reader = csv::Reader::from_reader(BufReader::new(open(path)?));
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::parse(format!("reading CSV header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::parse(format!("CSV row {row_no}: {e}")))?;
        let row = record
            .iter()
            .zip(&headers)
            .map(|(cell, col)| parse_cell(cell, row_no, col))
            .collect::<Result<Vec<f64>, DataError>>()?;
        rows.push(row);
    }

    Table::from_rows(headers, rows)
}

fn parse_cell(cell: &str, row: usize, col: &str) -> Result<f64, DataError> {
    let tok = cell.trim();
    if tok.is_empty() {
        return Err(DataError::parse(format!("row {row}, column '{col}': missing value")));
    }
    tok.parse::<f64>()
        .map_err(|_| DataError::parse(format!("row {row}, column '{col}': '{tok}' is not a number")))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "fixed acidity": 7.4, "alcohol": 9.4, "quality": 5 },
///   ...
/// ]
/// ```
///
/// Column order follows the keys of the first record.
fn load_json(path: &Path) -> Result<Table, DataError> {
    let root: JsonValue = serde_json::from_reader(BufReader::new(open(path)?))
        .map_err(|e| DataError::parse(format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| DataError::parse("expected top-level JSON array"))?;

    let headers: Vec<String> = match records.first() {
        Some(first) => first
            .as_object()
            .ok_or_else(|| DataError::parse("row 0 is not a JSON object"))?
            .keys()
            .cloned()
            .collect(),
        None => return Err(DataError::Empty),
    };

    let mut rows = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .ok_or_else(|| DataError::parse(format!("row {i} is not a JSON object")))?;
        if obj.len() != headers.len() {
            return Err(DataError::parse(format!(
                "row {i} has {} fields but row 0 has {}",
                obj.len(),
                headers.len()
            )));
        }
        let row = headers
            .iter()
            .map(|col| {
                obj.get(col).and_then(JsonValue::as_f64).ok_or_else(|| {
                    DataError::parse(format!("row {i}, column '{col}': missing or not a number"))
                })
            })
            .collect::<Result<Vec<f64>, DataError>>()?;
        rows.push(row);
    }

    Table::from_rows(headers, rows)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat numeric columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Nulls are rejected.
fn load_parquet(path: &Path) -> Result<Table, DataError> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(open(path)?)
        .map_err(|e| DataError::parse(format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| DataError::parse(format!("building parquet reader: {e}")))?;

    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();

    for batch_result in reader {
        let batch = batch_result.map_err(|e| DataError::parse(format!("reading parquet batch: {e}")))?;
        let schema = batch.schema();

        if columns.is_empty() {
            columns = schema
                .fields()
                .iter()
                .map(|f| (f.name().clone(), Vec::new()))
                .collect();
        }

        for (col_idx, (name, values)) in columns.iter_mut().enumerate() {
            extend_numeric(batch.column(col_idx), name, values)?;
        }
    }

    Table::from_columns(columns)
}

/// Append every value of a numeric Arrow column as `f64`.
fn extend_numeric(col: &Arc<dyn Array>, name: &str, out: &mut Vec<f64>) -> Result<(), DataError> {
    if col.null_count() > 0 {
        return Err(DataError::parse(format!("column '{name}' contains nulls")));
    }
    match col.data_type() {
        DataType::Float64 => {
            let arr = downcast::<Float64Array>(col, name)?;
            out.extend(arr.values().iter().copied());
        }
        DataType::Float32 => {
            let arr = downcast::<Float32Array>(col, name)?;
            out.extend(arr.values().iter().map(|&v| v as f64));
        }
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(col, name)?;
            out.extend(arr.values().iter().map(|&v| v as f64));
        }
        DataType::Int32 => {
            let arr = downcast::<Int32Array>(col, name)?;
            out.extend(arr.values().iter().map(|&v| v as f64));
        }
        other => {
            return Err(DataError::parse(format!(
                "column '{name}' has type {other:?}, expected a numeric type"
            )));
        }
    }
    Ok(())
}

fn downcast<'a, T: 'static>(col: &'a Arc<dyn Array>, name: &str) -> Result<&'a T, DataError> {
    col.as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| DataError::parse(format!("column '{name}': unexpected array layout")))
}
