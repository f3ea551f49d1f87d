//! Replay configuration.
//!
//! Anchor date, baseline and pacing of the simulated clock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which counting strategy the aggregator uses. Both produce identical
/// snapshots; they differ only in cost per tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CountingStrategy {
    /// Binary search on every tick.
    Stateless,
    /// Incremental cursor over the sorted day.
    #[default]
    Cursor,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct ReplayConfig {
    /// Recorded day to replay. `None` picks the earliest day in the data.
    pub replay_date: Option<NaiveDate>,

    /// Historical count added to every total.
    pub baseline_offset: u64,

    /// Simulated seconds per wall-clock second.
    #[validate(range(exclusive_min = 0.0, max = 3600.0))]
    pub speed_factor: f64,

    /// Seconds between live ticks.
    #[validate(range(min = 1, max = 3600))]
    pub tick_interval_seconds: u64,

    /// Simulated seconds per step of a sweep.
    #[validate(range(min = 1, max = 86400))]
    pub sweep_step_seconds: u64,

    pub strategy: CountingStrategy,

    /// Fixed UTC offset of the wall clock. `None` uses the host's local time.
    #[validate(range(min = -840, max = 840))]
    pub utc_offset_minutes: Option<i32>,

    /// Stop a live run after this many ticks.
    pub max_ticks: Option<u64>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            replay_date: None,
            baseline_offset: 0,
            speed_factor: 1.0,
            tick_interval_seconds: 1,
            sweep_step_seconds: 1,
            strategy: CountingStrategy::default(),
            utc_offset_minutes: None,
            max_ticks: None,
        }
    }
}
