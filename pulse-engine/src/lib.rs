//! # pulse-engine
//!
//! Drives replay sessions: loads the configured extract, ticks a session on
//! a timer (live) or a virtual clock (sweep) and fans every tick out to the
//! registered sinks.

pub mod diagnostics;
pub mod error;
pub mod format;
pub mod runtime;
pub mod sink;

pub use diagnostics::{DiagnosticsCollector, HashMismatchReport};
pub use error::EngineError;
pub use runtime::{ReplayRuntime, RunSummary, StopReason};
pub use sink::{ArrivalsCsvSink, ConsoleSink, RecordingSink, SeriesCsvSink, SnapshotSink};

pub mod prelude {
    pub use super::{EngineError, ReplayRuntime, RunSummary, SnapshotSink, StopReason};
}
