//! ## pulse-ingest::jitter
//! **Display-only jitter for events sharing a timestamp**
//!
//! Extracts with minute resolution put many procedures on the same instant,
//! which draws as a staircase in a trend chart. A jitter model spreads them
//! across the second they belong to. The offset lives on
//! [`Event::display_time`](pulse_core::Event::display_time) only; completion
//! times, and therefore every count, are untouched.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Produces a sub-second display offset for each loaded event.
pub trait DisplayJitter: Send {
    /// Offset in milliseconds, in `0..1000`.
    fn next_offset_ms(&mut self) -> u16;
}

/// Uniform jitter. Seeded models are reproducible across runs.
#[derive(Debug)]
pub struct RandomDisplayJitter {
    rng: SmallRng,
}

impl RandomDisplayJitter {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }
}

impl DisplayJitter for RandomDisplayJitter {
    fn next_offset_ms(&mut self) -> u16 {
        self.rng.random_range(0..1000)
    }
}

/// No jitter: display time equals completion time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDisplayJitter;

impl DisplayJitter for NoDisplayJitter {
    fn next_offset_ms(&mut self) -> u16 {
        0
    }
}
