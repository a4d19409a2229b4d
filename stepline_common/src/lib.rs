//! # Stepline Common
//!
//! Shared foundation for the stepline workspace: the six-axis motion-command
//! data model, cycle/Hz unit conversion, and TOML configuration loading.
//!
//! The command producer (console), the wire codec, the session transport and
//! the shared-memory relay all speak in terms of [`MotionCommand`]; this
//! crate is the single source of truth for its shape and for the calibration
//! constants of the pulse-generation unit.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod config;
pub mod consts;
pub mod convert;

pub use command::{AxisCommand, CommandError, ContentKind, GlobalEnable, MotionCommand};
pub use config::{ConfigError, ConfigLoader, EndpointConfig, LogLevel, SharedConfig};
pub use consts::{AXIS_COUNT, DEFAULT_PERIOD_CYCLES, DEFAULT_SECONDS_PER_CYCLE, DEFAULT_SERVER_PORT};
pub use convert::{Calibration, normalize_period};

/// Initialize the process-wide tracing dispatcher.
///
/// Called once at process start by each binary, with the level taken from
/// its loaded configuration. `RUST_LOG` overrides the configured level when
/// present.
pub fn init_tracing(level: LogLevel) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
