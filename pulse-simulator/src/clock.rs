//! # Simulated Clock
//!
//! Maps wall-clock instants onto the replayed day.
//!
//! The simulated day starts at the wall clock's time of day on the replay
//! date and then moves with elapsed wall time, scaled by the speed factor.
//! If the wall clock is already past the last procedure of the replay date,
//! the start is pulled back to that procedure so the replay does not open on
//! a finished day.
//!
//! ## Expectations:
//! - Pure: `advance` depends only on the fixed anchor and its argument
//! - Monotonic in `wallclock_now`
//! - Millisecond resolution

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use pulse_core::{CoreError, EventSequence};

/// Which day is replayed and the all-time total carried in from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayAnchor {
    pub replay_date: NaiveDate,
    pub baseline_offset: u64,
}

impl ReplayAnchor {
    pub fn new(replay_date: NaiveDate, baseline_offset: u64) -> Self {
        Self {
            replay_date,
            baseline_offset,
        }
    }
}

/// Simulated seconds per wall-clock second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedFactor(f64);

impl SpeedFactor {
    pub const REAL_TIME: SpeedFactor = SpeedFactor(1.0);

    /// # Errors
    /// [`CoreError::InvalidSpeed`] unless `factor` is finite and positive.
    pub fn new(factor: f64) -> Result<Self, CoreError> {
        if factor.is_finite() && factor > 0.0 {
            Ok(Self(factor))
        } else {
            Err(CoreError::InvalidSpeed(factor))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }

    fn scale(self, elapsed: TimeDelta) -> TimeDelta {
        // Floor keeps the mapping monotonic.
        let ms = (elapsed.num_milliseconds() as f64 * self.0).floor();
        TimeDelta::milliseconds(ms.min(i64::MAX as f64 / 2.0) as i64)
    }
}

impl Default for SpeedFactor {
    fn default() -> Self {
        Self::REAL_TIME
    }
}

/// Fixed anchor of a running replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedClock {
    wallclock_start: NaiveDateTime,
    simulated_start: NaiveDateTime,
    speed: SpeedFactor,
    clamped: bool,
}

impl SimulatedClock {
    /// Anchors a replay of `replay_date` at `wallclock_start`.
    ///
    /// # Errors
    /// [`CoreError::NoEventsForDate`] if `events` has nothing on `replay_date`.
    pub fn start(
        events: &EventSequence,
        replay_date: NaiveDate,
        wallclock_start: NaiveDateTime,
        speed: SpeedFactor,
    ) -> Result<Self, CoreError> {
        let last = events
            .last_instant_on(replay_date)
            .ok_or(CoreError::NoEventsForDate(replay_date))?;

        let requested = replay_date.and_time(wallclock_start.time());
        let clamped = requested > last;
        let simulated_start = if clamped { last } else { requested };

        tracing::debug!(
            %replay_date,
            %requested,
            %simulated_start,
            clamped,
            "Anchored simulated clock"
        );

        Ok(Self {
            wallclock_start,
            simulated_start,
            speed,
            clamped,
        })
    }

    /// Simulated instant corresponding to `wallclock_now`.
    ///
    /// Wall-clock instants before the anchor map to the simulated start.
    pub fn advance(&self, wallclock_now: NaiveDateTime) -> NaiveDateTime {
        let elapsed = (wallclock_now - self.wallclock_start).max(TimeDelta::zero());
        self.simulated_start
            .checked_add_signed(self.speed.scale(elapsed))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn simulated_start(&self) -> NaiveDateTime {
        self.simulated_start
    }

    pub fn wallclock_start(&self) -> NaiveDateTime {
        self.wallclock_start
    }

    pub fn speed(&self) -> SpeedFactor {
        self.speed
    }

    /// Whether the start was pulled back to the day's last event.
    pub fn was_clamped(&self) -> bool {
        self.clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Event;
    use proptest::prelude::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn t(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    fn events() -> EventSequence {
        EventSequence::new(vec![
            Event::new(t(9, 0, 0), "CT"),
            Event::new(t(9, 0, 5), "MRI"),
            Event::new(t(17, 30, 0), "CT"),
        ])
        .unwrap()
    }

    fn wall(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 20)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn start_uses_wallclock_time_of_day() {
        let clock = SimulatedClock::start(&events(), day(), wall(10, 15, 30), SpeedFactor::default())
            .unwrap();
        assert_eq!(clock.simulated_start(), t(10, 15, 30));
        assert!(!clock.was_clamped());
    }

    #[test]
    fn start_is_clamped_to_last_event_of_day() {
        let clock = SimulatedClock::start(&events(), day(), wall(21, 0, 0), SpeedFactor::default())
            .unwrap();
        assert_eq!(clock.simulated_start(), t(17, 30, 0));
        assert!(clock.was_clamped());
    }

    #[test]
    fn start_requires_events_on_the_date() {
        let other = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let err = SimulatedClock::start(&events(), other, wall(9, 0, 0), SpeedFactor::default())
            .unwrap_err();
        assert_eq!(err, CoreError::NoEventsForDate(other));
    }

    #[test]
    fn advance_follows_elapsed_wall_time() {
        let clock = SimulatedClock::start(&events(), day(), wall(9, 0, 0), SpeedFactor::default())
            .unwrap();
        assert_eq!(clock.advance(wall(9, 0, 0)), t(9, 0, 0));
        assert_eq!(clock.advance(wall(9, 0, 5)), t(9, 0, 5));
        // Before the anchor: no backward jump.
        assert_eq!(clock.advance(wall(8, 0, 0)), t(9, 0, 0));
    }

    #[test]
    fn advance_scales_with_speed() {
        let speed = SpeedFactor::new(60.0).unwrap();
        let clock = SimulatedClock::start(&events(), day(), wall(9, 0, 0), speed).unwrap();
        assert_eq!(clock.advance(wall(9, 0, 10)), t(9, 10, 0));
    }

    #[test]
    fn speed_must_be_positive_and_finite() {
        assert!(SpeedFactor::new(0.0).is_err());
        assert!(SpeedFactor::new(-1.0).is_err());
        assert!(SpeedFactor::new(f64::NAN).is_err());
        assert!(SpeedFactor::new(f64::INFINITY).is_err());
        assert_eq!(SpeedFactor::new(2.5).unwrap().get(), 2.5);
    }

    proptest! {
        #[test]
        fn advance_is_monotonic(
            start in 0i64..86_400,
            a in -10_000i64..200_000_000,
            b in -10_000i64..200_000_000,
            speed in 0.01f64..100.0,
        ) {
            let anchor = wall(0, 0, 0) + TimeDelta::seconds(start);
            let clock = SimulatedClock::start(&events(), day(), anchor, SpeedFactor::new(speed).unwrap()).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let t1 = clock.advance(anchor + TimeDelta::milliseconds(lo));
            let t2 = clock.advance(anchor + TimeDelta::milliseconds(hi));
            prop_assert!(t1 <= t2);
            prop_assert!(t1 >= clock.simulated_start());
        }
    }
}
