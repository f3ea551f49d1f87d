//! # Incremental Aggregator
//!
//! Turns a stream of simulated instants into [`Snapshot`]s and a cumulative
//! [`TimeSeries`].
//!
//! Two counting strategies are provided and must agree on every instant:
//! - [`StatelessCounter`]: binary search from scratch on every tick.
//! - [`CursorCounter`]: keeps a position in the sequence and only scans the
//!   events that completed since the previous tick. An instant earlier than
//!   the previous one re-seeks by binary search.

use chrono::NaiveDateTime;

use pulse_core::counter::prefix_len;
use pulse_core::{count_at, count_by_category_at, CategoryCounts, CoreError, EventSequence};

use crate::series::{SeriesPoint, TimeSeries};

/// Counts for the replayed day up to some instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub today_count: u64,
    pub category_counts: CategoryCounts,
}

/// Counting strategy over an immutable day of events.
pub trait CountStrategy {
    fn for_sequence(events: EventSequence) -> Self
    where
        Self: Sized;

    fn tally_at(&mut self, instant: NaiveDateTime) -> Tally;
}

#[derive(Debug, Clone)]
pub struct StatelessCounter {
    events: EventSequence,
}

impl CountStrategy for StatelessCounter {
    fn for_sequence(events: EventSequence) -> Self {
        Self { events }
    }

    fn tally_at(&mut self, instant: NaiveDateTime) -> Tally {
        Tally {
            today_count: count_at(&self.events, instant),
            category_counts: count_by_category_at(&self.events, instant),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CursorCounter {
    events: EventSequence,
    // Number of events already folded into `categories`.
    position: usize,
    categories: CategoryCounts,
    last_instant: Option<NaiveDateTime>,
}

impl CursorCounter {
    fn reseek(&mut self, instant: NaiveDateTime) {
        self.position = prefix_len(&self.events, instant);
        self.categories = count_by_category_at(&self.events, instant);
    }
}

impl CountStrategy for CursorCounter {
    fn for_sequence(events: EventSequence) -> Self {
        Self {
            events,
            position: 0,
            categories: CategoryCounts::new(),
            last_instant: None,
        }
    }

    fn tally_at(&mut self, instant: NaiveDateTime) -> Tally {
        match self.last_instant {
            Some(last) if instant < last => {
                tracing::trace!(%last, %instant, "Cursor moved backwards, re-seeking");
                self.reseek(instant);
            }
            _ => {
                let events = self.events.events();
                while let Some(event) = events.get(self.position) {
                    if event.completed_at() > instant {
                        break;
                    }
                    self.categories.increment(event.category());
                    self.position += 1;
                }
            }
        }
        self.last_instant = Some(instant);

        Tally {
            today_count: self.position as u64,
            category_counts: self.categories.clone(),
        }
    }
}

/// Aggregation result at one simulated instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub instant: NaiveDateTime,
    pub today_count: u64,
    pub category_counts: CategoryCounts,
    /// `baseline_offset + today_count`.
    pub total_count: u64,
}

/// Per-tick aggregation state over one replayed day.
#[derive(Debug, Clone)]
pub struct Aggregator<S: CountStrategy = CursorCounter> {
    baseline_offset: u64,
    strategy: S,
    series: TimeSeries,
    latest: Option<Snapshot>,
}

impl<S: CountStrategy> Aggregator<S> {
    pub fn new(day: EventSequence, baseline_offset: u64) -> Self {
        Self {
            baseline_offset,
            strategy: S::for_sequence(day),
            series: TimeSeries::new(),
            latest: None,
        }
    }

    /// Advances to `instant`, appending one point to the time series.
    ///
    /// # Errors
    /// [`CoreError::TimeRegression`] if `instant` precedes the previous tick.
    /// State is left untouched in that case.
    pub fn tick(&mut self, instant: NaiveDateTime) -> Result<Snapshot, CoreError> {
        if let Some(latest) = &self.latest {
            if instant < latest.instant {
                return Err(CoreError::TimeRegression {
                    previous: latest.instant,
                    requested: instant,
                });
            }
        }

        let snapshot = self.snapshot_at(instant);
        self.series
            .push(SeriesPoint::new(instant, snapshot.total_count))?;
        self.latest = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Snapshot at `instant` without recording a tick.
    pub fn snapshot_at(&mut self, instant: NaiveDateTime) -> Snapshot {
        let Tally {
            today_count,
            category_counts,
        } = self.strategy.tally_at(instant);

        Snapshot {
            instant,
            today_count,
            category_counts,
            total_count: self.baseline_offset.saturating_add(today_count),
        }
    }

    pub fn baseline_offset(&self) -> u64 {
        self.baseline_offset
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.latest.as_ref()
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }
}
