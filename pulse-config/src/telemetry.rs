//! Logging and metrics configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation::validate_log_level;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[validate(custom(function = validate_log_level))]
    pub log_level: String,

    /// Print the Prometheus text exposition when a run ends.
    pub dump_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            dump_metrics: false,
        }
    }
}
