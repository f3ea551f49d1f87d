//! Cumulative total over time, one point per tick, for trend display.

use chrono::{NaiveDateTime, Timelike};

use pulse_core::{Category, CoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPoint {
    /// Simulated time truncated to whole seconds.
    pub time: NaiveDateTime,
    pub total_count: u64,
}

impl SeriesPoint {
    pub fn new(instant: NaiveDateTime, total_count: u64) -> Self {
        Self {
            time: instant.with_nanosecond(0).unwrap_or(instant),
            total_count,
        }
    }
}

/// One event as it enters the count, placed at its display time.
///
/// Display times carry the load-time jitter, so events completed in the same
/// second plot as distinct points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrival {
    pub display_time: NaiveDateTime,
    pub category: Category,
    /// Running total including this event.
    pub total_count: u64,
}

/// Append-only series with non-decreasing point times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// [`CoreError::TimeRegression`] if `point` is older than the last point.
    pub fn push(&mut self, point: SeriesPoint) -> Result<(), CoreError> {
        if let Some(last) = self.points.last() {
            if point.time < last.time {
                return Err(CoreError::TimeRegression {
                    previous: last.time,
                    requested: point.time,
                });
            }
        }
        self.points.push(point);
        Ok(())
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeDelta};

    fn t(s: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + TimeDelta::seconds(s)
    }

    #[test]
    fn points_are_truncated_to_seconds() {
        let point = SeriesPoint::new(t(3) + TimeDelta::milliseconds(999), 7);
        assert_eq!(point.time, t(3));
    }

    #[test]
    fn equal_times_are_accepted_older_rejected() {
        let mut series = TimeSeries::new();
        series.push(SeriesPoint::new(t(1), 1)).unwrap();
        series
            .push(SeriesPoint::new(t(1) + TimeDelta::milliseconds(400), 1))
            .unwrap();
        series.push(SeriesPoint::new(t(2), 2)).unwrap();
        assert!(series.push(SeriesPoint::new(t(0), 2)).is_err());
        assert_eq!(series.len(), 3);
        assert_eq!(series.last().map(|p| p.total_count), Some(2));
    }
}
