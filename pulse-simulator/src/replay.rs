//! Replay module.
//!
//! Deterministic fast-forward through one recorded day. Instead of waiting on
//! the wall clock, a sweep drives a [`ManualClock`] in fixed simulated steps
//! from the day's first event to its last and folds every snapshot into a
//! BLAKE3 state hash. Two sweeps of the same data and settings yield the same
//! hash, which makes the hash usable as a regression check.

use std::time::Duration;

use blake3::Hasher;
use pulse_core::time::{ManualClock, WallClock};
use pulse_core::{CoreError, EventSequence};

use crate::aggregator::{CountStrategy, Snapshot};
use crate::clock::{ReplayAnchor, SpeedFactor};
use crate::series::TimeSeries;
use crate::session::{ReplaySession, TickOutput};

#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub final_snapshot: Snapshot,
    pub ticks: u64,
    pub series: TimeSeries,
    /// Hex-encoded BLAKE3 digest over every snapshot of the sweep.
    pub state_hash: String,
}

/// Sweeps `anchor.replay_date` in steps of `step`, calling `on_tick` after
/// every tick.
///
/// The sweep stops at the first error returned by `on_tick` and passes it on.
///
/// # Errors
/// [`CoreError::NoEventsForDate`] if the date has no events, or whatever
/// `on_tick` returns.
pub fn sweep_with<S, E, F>(
    events: &EventSequence,
    anchor: ReplayAnchor,
    step: Duration,
    mut on_tick: F,
) -> Result<SweepOutcome, E>
where
    S: CountStrategy,
    E: From<CoreError>,
    F: FnMut(&TickOutput) -> Result<(), E>,
{
    let first = events
        .first_instant_on(anchor.replay_date)
        .ok_or(CoreError::NoEventsForDate(anchor.replay_date))?;
    // Counts only change on whole seconds.
    let step = step.max(Duration::from_secs(1));

    let clock = ManualClock::new(first);
    let mut session: ReplaySession<S> =
        ReplaySession::start(events, anchor, clock.now(), SpeedFactor::REAL_TIME)?;
    let last = session.day().last_instant();
    let mut hasher = Hasher::new();

    let final_snapshot = loop {
        let output = session.tick(clock.now())?;
        hash_snapshot(&mut hasher, &output.snapshot);
        on_tick(&output)?;

        if output.snapshot.instant >= last {
            break output.snapshot;
        }
        clock.advance(step);
    };

    let state_hash = hex::encode(hasher.finalize().as_bytes());
    tracing::info!(
        replay_date = %anchor.replay_date,
        ticks = session.ticks(),
        total = final_snapshot.total_count,
        %state_hash,
        "Sweep complete"
    );

    Ok(SweepOutcome {
        final_snapshot,
        ticks: session.ticks(),
        series: session.series().clone(),
        state_hash,
    })
}

/// [`sweep_with`] without a per-tick observer.
pub fn sweep<S: CountStrategy>(
    events: &EventSequence,
    anchor: ReplayAnchor,
    step: Duration,
) -> Result<SweepOutcome, CoreError> {
    sweep_with::<S, CoreError, _>(events, anchor, step, |_| Ok(()))
}

fn hash_snapshot(hasher: &mut Hasher, snapshot: &Snapshot) {
    hasher.update(&snapshot.instant.and_utc().timestamp().to_le_bytes());
    hasher.update(&snapshot.today_count.to_le_bytes());
    hasher.update(&snapshot.total_count.to_le_bytes());
    for (category, count) in &snapshot.category_counts {
        hasher.update(category.as_bytes());
        hasher.update(&[0]);
        hasher.update(&count.to_le_bytes());
    }
}
