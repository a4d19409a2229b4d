//! Transport error types.

use thiserror::Error;

use stepline_wire::WireError;

/// Errors surfaced by a session transport.
///
/// All of these are terminal for the session they occur on; none trigger an
/// automatic retry.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No active socket: not yet connected, connect failed, or already shut
    /// down.
    #[error("session is not connected")]
    NotConnected,

    /// Outbound connection establishment failed.
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Target endpoint.
        addr: String,
        /// Source I/O error.
        source: std::io::Error,
    },

    /// Binding the listening socket failed.
    #[error("bind to {addr} failed: {source}")]
    Bind {
        /// Requested listen endpoint.
        addr: String,
        /// Source I/O error.
        source: std::io::Error,
    },

    /// Accepting the single peer connection failed.
    #[error("accept failed: {source}")]
    Accept {
        /// Source I/O error.
        source: std::io::Error,
    },

    /// Writing an outbound message failed.
    #[error("send failed: {source}")]
    Send {
        /// Source I/O error.
        source: std::io::Error,
    },

    /// The inbound stream became unreadable.
    #[error("receive failed: {source}")]
    Receive {
        /// Source codec/stream error.
        source: WireError,
    },
}
