//! # Stepline Wire Codec
//!
//! Deterministic, versioned encoding of [`MotionCommand`] values (and bare
//! lifecycle messages) to and from an octet stream suitable for a
//! connection-oriented transport.
//!
//! Every message is a self-delimiting frame:
//!
//! ```text
//! ┌──────────┬─────────┬──────────────┬─────────────────┐
//! │ magic ×4 │ version │ payload_len  │ payload bytes   │
//! │ "SLW\0"  │   u8    │   u32 LE     │                 │
//! └──────────┴─────────┴──────────────┴─────────────────┘
//! ```
//!
//! The payload field order is fixed: `content_kind`, `label`
//! (length-prefixed UTF-8), `all_axes_enable`, then axes 0..5 each as
//! `{enabled, direction, period}`: twenty `u32` values plus the label,
//! for every content kind, so `decode(encode(x)) == x` holds for every
//! valid command.
//!
//! The codec never blocks on its own: [`encode`]/[`decode`] are pure over
//! byte buffers, and the [`read_message`]/[`write_message`] adapters only
//! block inside the `Read`/`Write` implementation handed to them. Blocking
//! policy belongs to the transport.

#![deny(missing_docs)]
#![warn(clippy::all)]

mod error;
mod frame;

pub use error::WireError;
pub use frame::{
    FRAME_HEADER_LEN, MAX_LABEL_LEN, WIRE_MAGIC, WIRE_VERSION, decode, encode, read_message,
    write_message,
};
