//! Replay session: the tick transition handed to a driver.
//!
//! A session owns the fixed anchor, the simulated clock and the aggregation
//! state. It does not own a loop or any display handle; the driver calls
//! [`ReplaySession::tick`] with the current wall-clock time and forwards the
//! [`TickOutput`] to whatever renders it.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use pulse_core::{Category, CategoryCounts, CoreError, EventSequence};

use crate::aggregator::{Aggregator, CountStrategy, CursorCounter, Snapshot};
use crate::change::diff;
use crate::clock::{ReplayAnchor, SimulatedClock, SpeedFactor};
use crate::series::{Arrival, SeriesPoint, TimeSeries};

/// Everything one tick produces for the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutput {
    /// Wall-clock time the tick was computed for.
    pub wallclock: NaiveDateTime,
    pub snapshot: Snapshot,
    /// Categories whose count rose since the previous tick.
    pub changed: BTreeSet<Category>,
    pub point: SeriesPoint,
    /// Events counted for the first time on this tick, in sequence order.
    pub arrivals: Vec<Arrival>,
}

pub struct ReplaySession<S: CountStrategy = CursorCounter> {
    anchor: ReplayAnchor,
    day: EventSequence,
    clock: SimulatedClock,
    aggregator: Aggregator<S>,
    previous: CategoryCounts,
    ticks: u64,
}

impl<S: CountStrategy> ReplaySession<S> {
    /// Starts a replay of `anchor.replay_date` drawn from `events`.
    ///
    /// # Errors
    /// [`CoreError::NoEventsForDate`] if the date has no events.
    pub fn start(
        events: &EventSequence,
        anchor: ReplayAnchor,
        wallclock_start: NaiveDateTime,
        speed: SpeedFactor,
    ) -> Result<Self, CoreError> {
        let day = events.for_date(anchor.replay_date)?;
        let clock = SimulatedClock::start(&day, anchor.replay_date, wallclock_start, speed)?;

        tracing::info!(
            replay_date = %anchor.replay_date,
            baseline = anchor.baseline_offset,
            events = day.len(),
            simulated_start = %clock.simulated_start(),
            clamped = clock.was_clamped(),
            speed = speed.get(),
            "Replay session started"
        );

        Ok(Self {
            anchor,
            aggregator: Aggregator::new(day.clone(), anchor.baseline_offset),
            day,
            clock,
            previous: CategoryCounts::new(),
            ticks: 0,
        })
    }

    /// Runs one tick at `wallclock_now`.
    ///
    /// The first tick diffs against an empty tally, so every category already
    /// counted at the simulated start is reported as changed.
    ///
    /// # Errors
    /// [`CoreError::TimeRegression`] if the wall clock went backwards past the
    /// previous tick. The session must not be ticked again after an error.
    pub fn tick(&mut self, wallclock_now: NaiveDateTime) -> Result<TickOutput, CoreError> {
        let instant = self.clock.advance(wallclock_now);
        let counted_before = self.latest().map_or(0, |s| s.today_count);
        let snapshot = self.aggregator.tick(instant)?;
        let changed = diff(&self.previous, &snapshot.category_counts);
        let arrivals = self.arrivals(counted_before, snapshot.today_count);
        self.previous = snapshot.category_counts.clone();
        self.ticks += 1;

        tracing::trace!(
            tick = self.ticks,
            %instant,
            today = snapshot.today_count,
            changed = changed.len(),
            "Tick"
        );

        Ok(TickOutput {
            wallclock: wallclock_now,
            point: SeriesPoint::new(instant, snapshot.total_count),
            snapshot,
            changed,
            arrivals,
        })
    }

    // Counts never decrease within a session, so the new events are exactly
    // the slice between the previous and the current prefix length.
    fn arrivals(&self, from: u64, to: u64) -> Vec<Arrival> {
        let new_events = self
            .day
            .events()
            .get(from as usize..to as usize)
            .unwrap_or_default();
        let baseline = self.anchor.baseline_offset;

        new_events
            .iter()
            .zip(from + 1..)
            .map(|(event, today)| Arrival {
                display_time: event.display_time(),
                category: event.category().clone(),
                total_count: baseline.saturating_add(today),
            })
            .collect()
    }

    pub fn anchor(&self) -> ReplayAnchor {
        self.anchor
    }

    pub fn clock(&self) -> &SimulatedClock {
        &self.clock
    }

    /// The replayed day's events.
    pub fn day(&self) -> &EventSequence {
        &self.day
    }

    pub fn series(&self) -> &TimeSeries {
        self.aggregator.series()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.aggregator.latest()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Every event of the day has been counted.
    pub fn is_finished(&self) -> bool {
        self.latest()
            .is_some_and(|s| s.today_count == self.day.len() as u64)
    }
}
