//! # Pulse Telemetry
//!
//! Logging setup and Prometheus metrics for the replay engine.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
