//! Node configuration.

use serde::Deserialize;
use std::path::PathBuf;

use stepline_common::{ConfigError, EndpointConfig, SharedConfig};

/// Configuration of the device-side daemon.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "info"
/// service_name = "stepline-node-01"
///
/// [endpoint]
/// address = "192.168.1.64"
/// port = 8001
///
/// [relay]
/// region_path = "/dev/shm/stepline_region"
/// program_image = "/lib/firmware/stepper_io.bin"
/// engine_control_dir = "/sys/class/remoteproc/remoteproc1"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Common fields.
    pub shared: SharedConfig,
    /// Endpoint this node connects out to.
    pub endpoint: EndpointConfig,
    /// Shared-memory and engine settings.
    pub relay: RelaySection,
}

/// Relay-side settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySection {
    /// Backing path of the shared region mapping.
    pub region_path: PathBuf,
    /// Pulse-engine program image handed to the engine at session start.
    pub program_image: PathBuf,
    /// Engine control directory (remoteproc-style sysfs).
    pub engine_control_dir: PathBuf,
}

impl NodeConfig {
    /// Semantic validation of all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.endpoint.validate()?;
        if self.relay.region_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "relay.region_path cannot be empty".to_string(),
            ));
        }
        if self.relay.program_image.file_name().is_none() {
            return Err(ConfigError::ValidationError(
                "relay.program_image must name a file".to_string(),
            ));
        }
        if self.relay.engine_control_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "relay.engine_control_dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
