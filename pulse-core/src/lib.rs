//! # pulse-core
//!
//! Foundation layer for replaying a recorded day of procedure completions.
//!
//! ### Key Submodules:
//! - `event`: immutable, time-ordered event sequences with per-category indices
//! - `counter`: point-in-time counting over a sequence (binary search)
//! - `time`: wall clocks, both system-backed and virtual
//!
//! Nothing in this crate mutates an [`EventSequence`] after construction, so a
//! sequence can be shared between ticks (and threads) without locking.

pub mod counter;
pub mod error;
pub mod event;
pub mod time;

pub mod prelude {
    pub use crate::counter::{count_at, count_by_category_at, CategoryCounts};
    pub use crate::error::*;
    pub use crate::event::{Category, DateCount, Event, EventSequence};
    pub use crate::time::{ManualClock, SystemClock, WallClock};
}

pub use counter::{count_at, count_by_category_at, CategoryCounts};
pub use error::CoreError;
pub use event::{Category, DateCount, Event, EventSequence};
