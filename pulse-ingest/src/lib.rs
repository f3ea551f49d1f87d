//! pulse-ingest
//!
//! Turns a tabular extract of completed procedures into an
//! [`EventSequence`](pulse_core::EventSequence). Currently only CSV sources
//! are supported.

pub mod error;
pub mod jitter;
pub mod loader;

pub use error::IngestError;
pub use jitter::{DisplayJitter, NoDisplayJitter, RandomDisplayJitter};
pub use loader::{EventLoader, LoadReport, SourceLayout};
