//! CSV exports: the per-tick cumulative series (`time,total_count`) and the
//! per-event arrivals at their display times
//! (`display_time,category,total_count`).

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use tracing::info;

use pulse_simulator::{TickOutput, TimeSeries};

use crate::error::EngineError;
use crate::sink::SnapshotSink;

pub fn write_series<W: Write>(writer: W, series: &TimeSeries) -> Result<(), EngineError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["time", "total_count"])?;
    for point in series.points() {
        csv.write_record([
            point.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            point.total_count.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the series to `path` when the run ends.
#[derive(Debug, Clone)]
pub struct SeriesCsvSink {
    path: PathBuf,
}

impl SeriesCsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSink for SeriesCsvSink {
    fn on_tick(&mut self, _output: &TickOutput) -> Result<(), EngineError> {
        Ok(())
    }

    fn finish(&mut self, series: &TimeSeries) -> Result<(), EngineError> {
        let file = File::create(&self.path)?;
        write_series(file, series)?;
        info!(path = %self.path.display(), points = series.len(), "Series exported");
        Ok(())
    }
}

/// Streams every arrival to `path` as it is counted.
pub struct ArrivalsCsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl ArrivalsCsvSink {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["display_time", "category", "total_count"])?;
        Ok(Self {
            path,
            writer,
            rows: 0,
        })
    }
}

impl SnapshotSink for ArrivalsCsvSink {
    fn on_tick(&mut self, output: &TickOutput) -> Result<(), EngineError> {
        for arrival in &output.arrivals {
            self.writer.write_record([
                arrival.display_time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                arrival.category.to_string(),
                arrival.total_count.to_string(),
            ])?;
        }
        self.rows += output.arrivals.len();
        Ok(())
    }

    fn finish(&mut self, _series: &TimeSeries) -> Result<(), EngineError> {
        self.writer.flush()?;
        info!(path = %self.path.display(), rows = self.rows, "Arrivals exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pulse_simulator::SeriesPoint;

    #[test]
    fn writes_header_and_points() {
        let at = |s| {
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, s)
                .unwrap()
        };
        let mut series = TimeSeries::new();
        series.push(SeriesPoint::new(at(0), 101)).unwrap();
        series.push(SeriesPoint::new(at(5), 103)).unwrap();

        let mut buffer = Vec::new();
        write_series(&mut buffer, &series).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "time,total_count\n2024-03-01 09:00:00,101\n2024-03-01 09:00:05,103\n"
        );
    }
}
