use std::sync::Arc;

use parking_lot::Mutex;

use pulse_simulator::{TickOutput, TimeSeries};

use crate::error::EngineError;
use crate::sink::SnapshotSink;

/// Keeps every tick in memory. Clones share the same buffer, so a handle
/// kept outside the runtime can inspect what the runtime produced.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    outputs: Arc<Mutex<Vec<TickOutput>>>,
    finished: Arc<Mutex<Option<TimeSeries>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<TickOutput> {
        self.outputs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.outputs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.lock().is_empty()
    }

    /// The series handed over at the end of the run, if it ended.
    pub fn finished_series(&self) -> Option<TimeSeries> {
        self.finished.lock().clone()
    }
}

impl SnapshotSink for RecordingSink {
    fn on_tick(&mut self, output: &TickOutput) -> Result<(), EngineError> {
        self.outputs.lock().push(output.clone());
        Ok(())
    }

    fn finish(&mut self, series: &TimeSeries) -> Result<(), EngineError> {
        *self.finished.lock() = Some(series.clone());
        Ok(())
    }
}
