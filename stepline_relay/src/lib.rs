//! # Stepline Relay
//!
//! The real-time handoff: projecting a [`MotionCommand`] into the fixed
//! 80-byte shared-memory region the pulse engine polls, without the engine
//! ever observing a partial update.
//!
//! The protocol is a single-writer/single-reader commit discipline. For
//! each logical update the relay writes every data field at its fixed byte
//! offset, in any order, and then, strictly last, sets the commit
//! semaphore at offset 0. The engine consults the data fields only after it
//! observes the semaphore transition, and consumes (clears) the semaphore
//! itself. No lock is needed: there is one writer, one reader, and one
//! direction of dependency.
//!
//! [`MotionCommand`]: stepline_common::MotionCommand

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod layout;
pub mod region;
pub mod relay;

pub use engine::{PulseEngine, RemoteprocPulseEngine};
pub use error::RelayError;
pub use layout::{
    ALL_AXES_ENABLE_OFFSET, REGION_SIZE, REGION_WORDS, SEMAPHORE_OFFSET, axis_direction_offset,
    axis_enabled_offset, axis_period_offset,
};
pub use region::{CommandRegion, SharedMemoryRegion};
pub use relay::CommandRelay;
