//! Relay error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting or driving a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The shared-memory backing resource cannot be opened or mapped.
    /// Fatal at session start; there is no degraded mode.
    #[error("shared region unavailable at {path}: {source}")]
    RegionUnavailable {
        /// Backing path that failed.
        path: PathBuf,
        /// Source I/O error.
        source: std::io::Error,
    },

    /// The relay session has ended (shutdown sentinel already relayed);
    /// further updates are refused.
    #[error("relay session has ended")]
    SessionEnded,

    /// The pulse engine could not be started.
    #[error("pulse engine start failed: {source}")]
    EngineStart {
        /// Source I/O error from the engine control interface.
        source: std::io::Error,
    },

    /// The pulse engine could not be stopped.
    #[error("pulse engine stop failed: {source}")]
    EngineStop {
        /// Source I/O error from the engine control interface.
        source: std::io::Error,
    },
}
