//! Pulse-engine lifecycle control.
//!
//! The engine itself is an opaque real-time program running on a
//! coprocessor; this module only starts and stops it. Its data contract
//! (poll offset 0 of a zero-initialized region, consume the semaphore,
//! read the other fields) lives in [`crate::layout`].

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::RelayError;

/// Start/stop contract of the external pulse-generation unit.
///
/// `start` is handed the program image the unit must execute; the region it
/// will poll has already been zero-initialized by the relay at that point.
pub trait PulseEngine {
    /// Load and start the engine program.
    fn start(&mut self, program_image: &Path) -> Result<(), RelayError>;

    /// Issue the engine's stop sequence.
    fn stop(&mut self) -> Result<(), RelayError>;
}

/// Drives a coprocessor through a remoteproc-style sysfs control
/// directory: the firmware name is written to `firmware`, then `start` /
/// `stop` to `state`.
pub struct RemoteprocPulseEngine {
    control_dir: PathBuf,
}

impl RemoteprocPulseEngine {
    /// Engine controlled through `control_dir` (e.g.
    /// `/sys/class/remoteproc/remoteproc1`).
    pub fn new(control_dir: impl Into<PathBuf>) -> Self {
        Self {
            control_dir: control_dir.into(),
        }
    }
}

impl PulseEngine for RemoteprocPulseEngine {
    fn start(&mut self, program_image: &Path) -> Result<(), RelayError> {
        let firmware = program_image
            .file_name()
            .ok_or_else(|| RelayError::EngineStart {
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("program image path has no file name: {}", program_image.display()),
                ),
            })?;

        std::fs::write(self.control_dir.join("firmware"), firmware.as_encoded_bytes())
            .map_err(|source| RelayError::EngineStart { source })?;
        std::fs::write(self.control_dir.join("state"), b"start")
            .map_err(|source| RelayError::EngineStart { source })?;

        info!(
            target: "stepline_relay",
            image = %program_image.display(),
            "pulse engine running"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RelayError> {
        std::fs::write(self.control_dir.join("state"), b"stop")
            .map_err(|source| RelayError::EngineStop { source })?;
        info!(target: "stepline_relay", "pulse engine stopped");
        Ok(())
    }
}
