use std::path::PathBuf;

use pulse_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Data file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Column '{0}' not found in header")]
    MissingColumn(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
