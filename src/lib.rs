// Library surface for headless/integration tests and reuse.
// The TUI shell (main.rs, ui.rs) stays out of the library.
pub mod celebration;
pub mod config;
pub mod corpus;
pub mod feedback;
pub mod generator;
pub mod practice;
pub mod progress;
pub mod round;
pub mod runtime;

/// Interval between app ticks; sessions recompute elapsed time on each.
pub const TICK_RATE_MS: u64 = 100;
