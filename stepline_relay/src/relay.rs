//! The command relay: one session's single writer of the shared region.

use std::path::Path;
use std::sync::atomic::{Ordering, fence};

use tracing::{debug, info};

use stepline_common::{GlobalEnable, MotionCommand, normalize_period};

use crate::engine::PulseEngine;
use crate::error::RelayError;
use crate::layout::{
    ALL_AXES_ENABLE_OFFSET, SEMAPHORE_OFFSET, axis_direction_offset, axis_enabled_offset,
    axis_period_offset,
};
use crate::region::CommandRegion;

/// Translates motion commands into shared-memory field writes and drives
/// the commit handoff.
///
/// The relay owns the region for the lifetime of one engine session and is
/// its only writer. Update calls take `&mut self`, so a single in-flight
/// writer is enforced by ownership; callers that share a relay across
/// threads must do so behind a lock or a single owning thread.
pub struct CommandRelay<R: CommandRegion, E: PulseEngine> {
    region: Option<R>,
    engine: E,
}

impl<R: CommandRegion, E: PulseEngine> CommandRelay<R, E> {
    /// Begin an engine session.
    ///
    /// Clears the region to zero (the engine expects semaphore 0 and all
    /// axes disabled on startup), then starts the engine with the given
    /// program image.
    pub fn start(mut region: R, mut engine: E, program_image: &Path) -> Result<Self, RelayError> {
        region.clear();
        engine.start(program_image)?;
        info!(target: "stepline_relay", "relay session started");
        Ok(Self {
            region: Some(region),
            engine,
        })
    }

    /// Apply one motion command to the region.
    ///
    /// Writes every data field first (global enable, then each axis's
    /// enabled flag, period and direction), then, strictly last, sets the
    /// commit semaphore. A zero period is replaced with the default period
    /// before it can reach the region.
    ///
    /// A command carrying the shutdown sentinel is committed like any
    /// other, after which the engine is stopped and the region released;
    /// every later call fails with [`RelayError::SessionEnded`].
    pub fn apply(&mut self, cmd: &MotionCommand) -> Result<(), RelayError> {
        let region = self.region.as_mut().ok_or(RelayError::SessionEnded)?;

        region.write_u32(ALL_AXES_ENABLE_OFFSET, cmd.all_axes_enable as u32);
        for (i, axis) in cmd.axes.iter().enumerate() {
            region.write_u32(axis_enabled_offset(i), u32::from(axis.enabled));
            region.write_u32(axis_period_offset(i), normalize_period(axis.period));
            region.write_u32(axis_direction_offset(i), u32::from(axis.direction));
        }

        // Publish: all data writes must be visible before the semaphore.
        fence(Ordering::Release);
        region.write_u32(SEMAPHORE_OFFSET, 1);
        debug!(target: "stepline_relay", "committed {}", cmd.to_display_string());

        if cmd.all_axes_enable == GlobalEnable::Shutdown {
            info!(target: "stepline_relay", "shutdown sentinel relayed, ending session");
            self.region = None;
            self.engine.stop()?;
        }
        Ok(())
    }

    /// True once the shutdown sentinel has been relayed.
    pub fn is_ended(&self) -> bool {
        self.region.is_none()
    }
}
