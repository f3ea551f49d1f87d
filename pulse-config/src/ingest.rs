//! Source data configuration.
//!
//! Where the procedure extract lives and how its columns are read.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::{validate_column_name, validate_delimiter, validate_timestamp_formats};

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// CSV extract to replay. Usually supplied on the command line.
    pub data_path: Option<PathBuf>,

    #[validate(custom(function = validate_column_name))]
    pub timestamp_column: String,

    #[validate(custom(function = validate_column_name))]
    pub category_column: String,

    /// `chrono` strftime formats, tried in order.
    #[validate(custom(function = validate_timestamp_formats))]
    pub timestamp_formats: Vec<String>,

    /// Categories to keep. Empty keeps all of them.
    pub include_categories: Vec<String>,

    #[validate(custom(function = validate_delimiter))]
    pub delimiter: char,

    /// Attach a random sub-second display offset to each event.
    pub display_jitter: bool,

    /// Seed for the display jitter. `None` seeds from entropy.
    pub jitter_seed: Option<u64>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            timestamp_column: "PROCEDURE_END".into(),
            category_column: "SECTION_CODE".into(),
            timestamp_formats: vec!["%d-%m-%y %H:%M:%S".into(), "%d-%m-%y %H:%M".into()],
            include_categories: Vec::new(),
            delimiter: ',',
            display_jitter: false,
            jitter_seed: None,
        }
    }
}
