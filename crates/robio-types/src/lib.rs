use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest button number a single port can report (one bit per button in a
/// `u32` mask).
pub const MAX_BUTTONS: u32 = 32;

/// Bit for 1-based `button`, or `None` when the number is out of range.
pub fn button_bit(button: u32) -> Option<u32> {
    if (1..=MAX_BUTTONS).contains(&button) {
        Some(1u32 << (button - 1))
    } else {
        None
    }
}

/// A single edge-triggered button transition observed by a sampler.
///
/// Button numbers are 1-based and derived from the bit position in the raw
/// bitmask (bit 0 is button 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    /// 1-based button number.
    pub button: u32,
    /// `true` for a press, `false` for a release.
    pub pressed: bool,
    /// Robot time at which the transition was sampled.
    pub at: Duration,
}

impl ButtonEvent {
    pub fn new(button: u32, pressed: bool, at: Duration) -> Self {
        Self {
            button,
            pressed,
            at,
        }
    }

    /// Bit of the raw mask this event was derived from, or `None` for a
    /// button number outside `1..=MAX_BUTTONS` (possible after
    /// deserialization).
    pub fn mask(&self) -> Option<u32> {
        button_bit(self.button)
    }
}

/// Robot run mode as reported by the field / driver station.
///
/// Only [`RunMode::Disabled`] affects the input core: button events are not
/// dispatched while the robot is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl RunMode {
    pub fn is_disabled(self) -> bool {
        matches!(self, RunMode::Disabled)
    }
}

/// Calibration fields mapping a sensor's native reading onto
/// application-facing units: `sign * (value - offset) * scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Either `1.0` or `-1.0`.
    pub sign: f64,
    pub scale: f64,
    pub offset: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            sign: 1.0,
            scale: 1.0,
            offset: 0.0,
        }
    }
}

impl Calibration {
    /// Build a calibration from an inversion flag plus scale and offset.
    pub fn new(inverted: bool, scale: f64, offset: f64) -> Self {
        Self {
            sign: if inverted { -1.0 } else { 1.0 },
            scale,
            offset,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.sign < 0.0
    }

    pub fn set_inverted(&mut self, inverted: bool) {
        self.sign = if inverted { -1.0 } else { 1.0 };
    }

    /// Apply the full transform to `value`.
    pub fn apply(&self, value: f64) -> f64 {
        self.sign * (value - self.offset) * self.scale
    }

    /// Apply offset and scale only, leaving direction to the caller.
    pub fn apply_unsigned(&self, value: f64) -> f64 {
        (value - self.offset) * self.scale
    }
}

/// Workspace-wide error type for the input and sensor core.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RobioError {
    /// The backend cannot honour the requested calibration operation.
    #[error("Unsupported calibration on {channel}: {operation}")]
    UnsupportedCalibration { channel: String, operation: String },

    /// A raw-source collaborator failed to deliver a sample this cycle.
    #[error("Raw read failed on {source_id}: {details}")]
    RawReadFailed { source_id: String, details: String },

    #[error("Invalid deadband threshold {0}: must be within [0, 1)")]
    InvalidDeadband(f64),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RobioError {
    pub fn unsupported(channel: impl Into<String>, operation: impl Into<String>) -> Self {
        RobioError::UnsupportedCalibration {
            channel: channel.into(),
            operation: operation.into(),
        }
    }

    pub fn raw_read(source_id: impl Into<String>, details: impl Into<String>) -> Self {
        RobioError::RawReadFailed {
            source_id: source_id.into(),
            details: details.into(),
        }
    }
}
