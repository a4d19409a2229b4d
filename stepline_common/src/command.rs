//! Motion-command data model.
//!
//! A [`MotionCommand`] is one snapshot of desired motion state for all six
//! axes, created per message, immutable once queued for send or relay, and
//! discarded after projection into shared memory or an operator display.

use thiserror::Error;

use crate::consts::{AXIS_COUNT, DEFAULT_PERIOD_CYCLES};

// ─── Content kind ───────────────────────────────────────────────────

/// Tags whether a message carries a session lifecycle signal or a payload.
///
/// Wire values are fixed; peers refuse anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum ContentKind {
    /// No data content.
    #[default]
    NoData = 0,
    /// The remote side has connected.
    RemoteConnect = 1,
    /// The remote side is disconnecting.
    RemoteDisconnect = 2,
    /// The message carries operator-provided content.
    UserData = 3,
}

impl ContentKind {
    /// Convert from the raw wire value. Returns `None` for undefined tags.
    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::NoData),
            1 => Some(Self::RemoteConnect),
            2 => Some(Self::RemoteDisconnect),
            3 => Some(Self::UserData),
            _ => None,
        }
    }
}

// ─── Global enable ──────────────────────────────────────────────────

/// Tri-state global axis enable.
///
/// `Shutdown` is a reserved sentinel value of the enable field: on receipt
/// the relay commits the update, stops the pulse engine and ends its
/// session. The overloaded encoding is part of the external pulse-engine
/// contract and is preserved as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum GlobalEnable {
    /// All axes disabled.
    #[default]
    Disabled = 0,
    /// Axes run according to their per-axis enable flags.
    Enabled = 1,
    /// Terminate the receiving pulse session.
    Shutdown = 2,
}

impl GlobalEnable {
    /// Convert from the raw wire value. Returns `None` for undefined values.
    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Enabled),
            2 => Some(Self::Shutdown),
            _ => None,
        }
    }
}

// ─── Axis command ───────────────────────────────────────────────────

/// Per-axis desired state. Axis identity is positional (0..5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCommand {
    /// Pulse train on/off for this axis.
    pub enabled: bool,
    /// Polarity of the direction pin.
    pub direction: bool,
    /// Pulse period, in timer cycles (or Hz before unit conversion).
    /// Never zero on the wire or in shared memory.
    pub period: u32,
}

impl Default for AxisCommand {
    fn default() -> Self {
        Self {
            enabled: false,
            direction: false,
            period: DEFAULT_PERIOD_CYCLES,
        }
    }
}

// ─── Motion command ─────────────────────────────────────────────────

/// One full six-axis motion-command snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MotionCommand {
    /// Lifecycle signal vs payload tag.
    pub content_kind: ContentKind,
    /// Free-text diagnostic label. Empty string is the absence value,
    /// never a null-like state.
    pub label: String,
    /// Global enable for all axes (carries the shutdown sentinel).
    pub all_axes_enable: GlobalEnable,
    /// Per-axis commands, axis 0 through 5.
    pub axes: [AxisCommand; AXIS_COUNT],
}

impl MotionCommand {
    /// A bare lifecycle message of the given kind, default payload.
    pub fn lifecycle(kind: ContentKind) -> Self {
        Self {
            content_kind: kind,
            ..Self::default()
        }
    }

    /// A `UserData` message carrying the given diagnostic label.
    pub fn user_data(label: impl Into<String>) -> Self {
        Self {
            content_kind: ContentKind::UserData,
            label: label.into(),
            ..Self::default()
        }
    }

    /// Deterministic human-readable rendering of every field, axes 0→5,
    /// fixed field order. Used for diagnostics and trace output.
    pub fn to_display_string(&self) -> String {
        let mut out = format!(
            "Kind={:?}, Label=\"{}\", AllAxes={}",
            self.content_kind, self.label, self.all_axes_enable as u32
        );
        for (i, axis) in self.axes.iter().enumerate() {
            out.push_str(&format!(
                ", Axis{}={}, {}, {}",
                i, axis.enabled as u32, axis.direction as u32, axis.period
            ));
        }
        out
    }

    /// Sender-side validation: every axis period must be non-zero before a
    /// command is accepted for transmission. All-or-nothing; the first
    /// violating axis is reported and no wire message may be produced.
    pub fn validate_for_send(&self) -> Result<(), CommandError> {
        for (i, axis) in self.axes.iter().enumerate() {
            if axis.period == 0 {
                return Err(CommandError::InvalidSpeed { axis: i });
            }
        }
        Ok(())
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Local command validation failures, recovered without any transmission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// An axis was asked to run at speed zero.
    #[error("axis {axis}: zero is not a valid speed")]
    InvalidSpeed {
        /// Index of the first offending axis (0..5).
        axis: usize,
    },
}
