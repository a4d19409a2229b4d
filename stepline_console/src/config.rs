//! Console configuration, including the axis-control state that becomes
//! the outbound motion command.

use serde::Deserialize;

use stepline_common::{
    AXIS_COUNT, ConfigError, DEFAULT_SECONDS_PER_CYCLE, EndpointConfig, SharedConfig,
};

/// Unit the configured axis speeds are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    /// Raw timer-cycle counts, passed through unchanged.
    #[default]
    Cycles,
    /// Hertz, converted to cycles with the configured calibration.
    Hz,
}

/// Configuration of the operator console.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "info"
/// service_name = "stepline-console"
///
/// [endpoint]
/// address = "0.0.0.0"
/// port = 8001
///
/// [command]
/// speed_unit = "cycles"
/// all_axes_enable = true
///
/// [[command.axis]]
/// enabled = true
/// direction = true
/// speed = 5000000
/// # … six axis tables in total
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Common fields.
    pub shared: SharedConfig,
    /// Endpoint this console listens on.
    pub endpoint: EndpointConfig,
    /// The axis-control state to send.
    pub command: CommandSection,
}

/// Operator axis-control state.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSection {
    /// Unit of the per-axis `speed` values.
    #[serde(default)]
    pub speed_unit: SpeedUnit,

    /// Master enable sent with the command.
    #[serde(default)]
    pub all_axes_enable: bool,

    /// Seconds per engine timer cycle, for Hz conversion.
    #[serde(default = "default_seconds_per_cycle")]
    pub seconds_per_cycle: f64,

    /// Exactly one table per axis, positional order 0..5.
    pub axis: Vec<AxisSettings>,
}

fn default_seconds_per_cycle() -> f64 {
    DEFAULT_SECONDS_PER_CYCLE
}

/// One axis row of the operator state.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisSettings {
    /// Pulse train on/off.
    #[serde(default)]
    pub enabled: bool,
    /// Direction-pin polarity.
    #[serde(default)]
    pub direction: bool,
    /// Speed in `speed_unit` units. Zero is rejected before any send.
    pub speed: u32,
}

impl ConsoleConfig {
    /// Semantic validation of all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.endpoint.validate()?;
        if self.command.axis.len() != AXIS_COUNT {
            return Err(ConfigError::ValidationError(format!(
                "command.axis must have exactly {AXIS_COUNT} entries, found {}",
                self.command.axis.len()
            )));
        }
        if !(self.command.seconds_per_cycle.is_finite() && self.command.seconds_per_cycle > 0.0) {
            return Err(ConfigError::ValidationError(
                "command.seconds_per_cycle must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}
