/// Data layer: loading, the numeric table model, and the train/test split.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  pop target column → features + target
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  split    │  seeded shuffle → train / test
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod split;

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong between the input file and a usable dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input: {message}")]
    Parse { message: String },

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("input contains no data rows")]
    Empty,

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("invalid split: {0}")]
    InvalidSplit(String),
}

impl DataError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        DataError::Parse {
            message: message.into(),
        }
    }
}
