/*!
# Pulse Simulator

Temporal replay engine for a recorded day of procedure completions.

## Key Components:
- **Simulated Clock:** maps wall-clock time onto the replayed day.
- **Aggregator:** per-tick snapshots with stateless or cursor-based counting.
- **Change Detection:** which categories rose since the previous tick.
- **Replay Session:** the tick transition `(state, wallclock_now) -> TickOutput`.
- **Replay Engine:** deterministic fast-forward sweeps with a state hash.
*/

pub mod aggregator;
pub mod change;
pub mod clock;
pub mod replay;
pub mod series;
pub mod session;

pub use aggregator::{Aggregator, CountStrategy, CursorCounter, Snapshot, StatelessCounter, Tally};
pub use change::diff;
pub use clock::{ReplayAnchor, SimulatedClock, SpeedFactor};
pub use replay::{sweep, sweep_with, SweepOutcome};
pub use series::{Arrival, SeriesPoint, TimeSeries};
pub use session::{ReplaySession, TickOutput};
