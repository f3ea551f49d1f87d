//! # Pulse Configuration System
//!
//! Layered configuration for the procedure replay engine.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. `config/pulse.yaml`
//! 3. `config/<PULSE_ENV>.yaml` (`PULSE_ENV` defaults to `production`)
//! 4. `PULSE_*` environment variables, nested with `__`
//!    (`PULSE_REPLAY__SPEED_FACTOR=60`)
//!
//! Command-line overrides are applied by the caller, followed by
//! [`PulseConfig::validated`].

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod display;
mod error;
mod ingest;
mod replay;
mod telemetry;
mod validation;

pub use display::DisplayConfig;
pub use error::ConfigError;
pub use ingest::IngestConfig;
pub use replay::{CountingStrategy, ReplayConfig};
pub use telemetry::TelemetryConfig;

const BASE_FILE: &str = "config/pulse.yaml";
const ENV_PREFIX: &str = "PULSE_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
#[serde(default)]
pub struct PulseConfig {
    #[validate(nested)]
    pub ingest: IngestConfig,

    #[validate(nested)]
    pub replay: ReplayConfig,

    #[validate(nested)]
    pub telemetry: TelemetryConfig,

    #[validate(nested)]
    pub display: DisplayConfig,
}

impl PulseConfig {
    /// Load configuration from the default files and the environment.
    ///
    /// Missing files are skipped.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(PulseConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        let env = std::env::var("PULSE_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{env}.yaml");
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract(figment)
    }

    /// Load configuration from an explicit file on top of the defaults.
    ///
    /// Environment variables still take precedence over the file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment =
            Figment::from(Serialized::defaults(PulseConfig::default())).merge(Yaml::file(path));
        Self::extract(figment)
    }

    /// Re-check the configuration after programmatic overrides.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Self>()
            .map_err(ConfigError::from)
            .and_then(Self::validated)
    }
}
