//! Codec error types.

use thiserror::Error;

/// Errors produced while encoding or decoding wire frames.
#[derive(Debug, Error)]
pub enum WireError {
    /// Framing is inconsistent or a field value is out of range.
    #[error("malformed message: {detail}")]
    MalformedMessage {
        /// What was inconsistent.
        detail: String,
    },

    /// The content-kind tag is not one of the defined kinds.
    #[error("unknown content kind: {value}")]
    UnknownContentKind {
        /// The offending tag value.
        value: u32,
    },

    /// The underlying stream failed.
    #[error("stream error: {source}")]
    Io {
        /// Source I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl WireError {
    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedMessage {
            detail: detail.into(),
        }
    }

    /// True for decode-time failures where the offending message can be
    /// dropped and the stream read again; false when the stream itself is
    /// unreadable.
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}
