use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("Dataset contains no parseable events")]
    EmptyDataset,

    #[error("No events recorded for {0}")]
    NoEventsForDate(NaiveDate),

    #[error("Simulated time moved backwards: {requested} is before {previous}")]
    TimeRegression {
        previous: NaiveDateTime,
        requested: NaiveDateTime,
    },

    #[error("Invalid speed factor: {0} (must be finite and positive)")]
    InvalidSpeed(f64),
}
