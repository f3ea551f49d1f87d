//! Consumers of tick outputs.
//!
//! The runtime owns the loop; sinks only see the result of each tick and,
//! once the run ends, the accumulated time series.

mod console;
mod recording;
mod series_csv;

pub use console::ConsoleSink;
pub use recording::RecordingSink;
pub use series_csv::{write_series, ArrivalsCsvSink, SeriesCsvSink};

use pulse_simulator::{TickOutput, TimeSeries};

use crate::error::EngineError;

pub trait SnapshotSink: Send {
    fn on_tick(&mut self, output: &TickOutput) -> Result<(), EngineError>;

    /// Called once after the last tick.
    fn finish(&mut self, _series: &TimeSeries) -> Result<(), EngineError> {
        Ok(())
    }
}
