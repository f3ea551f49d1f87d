use std::path::PathBuf;

use thiserror::Error;

use pulse_config::ConfigError;
use pulse_core::CoreError;
use pulse_ingest::IngestError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Replay error: {0}")]
    Core(#[from] CoreError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No data file configured (pass --data or set ingest.data_path)")]
    MissingDataPath,

    #[error("Delimiter {0:?} does not fit in a single byte")]
    InvalidDelimiter(char),

    #[error("UTC offset of {0} minutes is out of range")]
    InvalidUtcOffset(i32),

    #[error("{sink} sink failed: {source}")]
    Sink {
        sink: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("CSV export failed: {0}")]
    SeriesExport(#[from] csv::Error),

    #[error("Bug report serialization failed: {0}")]
    Report(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        expected: String,
        actual: String,
        report: Option<PathBuf>,
    },
}
