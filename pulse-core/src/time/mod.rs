//! ## pulse-core::time
//! **Wall clocks**
//!
//! The replay engine never reads the system time directly. It asks a
//! [`WallClock`], which is either the [`SystemClock`] (live replay) or a
//! [`ManualClock`] that only moves when told to (tests and sweeps).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{FixedOffset, Local, NaiveDateTime, TimeDelta, Utc};

/// Source of "now" as a local, timezone-free date-time.
pub trait WallClock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the calendar time once, then advances with a monotonic timer.
///
/// Later adjustments of the system clock are not observed, so `now()` never
/// goes backwards during a run.
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin_wall: NaiveDateTime,
    origin: Instant,
}

impl SystemClock {
    /// Anchors to the machine's local timezone.
    pub fn local() -> Self {
        Self::anchored_at(Local::now().naive_local())
    }

    /// Anchors to a fixed UTC offset, independent of the machine's timezone.
    pub fn with_utc_offset(offset: FixedOffset) -> Self {
        Self::anchored_at(Utc::now().with_timezone(&offset).naive_local())
    }

    fn anchored_at(origin_wall: NaiveDateTime) -> Self {
        Self {
            origin_wall,
            origin: Instant::now(),
        }
    }
}

impl WallClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).unwrap_or(TimeDelta::MAX);
        self.origin_wall
            .checked_add_signed(elapsed)
            .unwrap_or(NaiveDateTime::MAX)
    }
}

/// A virtual clock that advances in milliseconds, only when asked to.
///
/// Clones share the same offset, so a driver and a test can hold the same clock.
#[derive(Clone, Debug)]
pub struct ManualClock {
    epoch: NaiveDateTime,
    // Shared atomic counter of milliseconds elapsed since `epoch`.
    offset_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(epoch: NaiveDateTime) -> Self {
        Self {
            epoch,
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.offset_ms.load(Ordering::Acquire))
    }

    #[inline]
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_ms.fetch_add(ms, Ordering::Release);
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = TimeDelta::from_std(self.elapsed()).unwrap_or(TimeDelta::MAX);
        self.epoch
            .checked_add_signed(elapsed)
            .unwrap_or(NaiveDateTime::MAX)
    }
}

impl<C: WallClock + ?Sized> WallClock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
