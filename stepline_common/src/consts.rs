//! Workspace-wide constants.

/// Number of independently configurable stepper axes.
pub const AXIS_COUNT: usize = 6;

/// Default pulse period in timer cycles.
///
/// Used wherever a period is absent or would otherwise be zero: default
/// command construction, zero-speed conversion, and normalization of a zero
/// period received from a peer.
pub const DEFAULT_PERIOD_CYCLES: u32 = 50_000;

/// Seconds per timer cycle of the stock pulse-engine build.
///
/// One countdown cycle of the engine's inner loop takes 660 ns. If the
/// engine program changes, this calibration must change with it; deployments
/// override it in their configuration.
pub const DEFAULT_SECONDS_PER_CYCLE: f64 = 660e-9;

/// Default TCP port the console listens on and the node connects to.
pub const DEFAULT_SERVER_PORT: u16 = 8001;
