//! [`EncoderChannel`] – calibrated position over heterogeneous absolute
//! position sensors.
//!
//! Every channel carries the same [`Calibration`] triple (sign, scale,
//! offset), but backends do not all compose it the same way.  The backend is
//! therefore an explicit tag, [`EncoderKind`], and each tag has one fixed
//! composition order:
//!
//! | Kind | Position | `set_inverted` | `reset` |
//! |---|---|---|---|
//! | [`Analog`][EncoderKind::Analog] | `sign * (unwrapped - offset) * scale` | software sign | zeroes the revolution counter at the current position |
//! | [`Absolute`][EncoderKind::Absolute] | `sign * (raw - offset) * scale` | software sign | no-op |
//! | [`SensorInverted`][EncoderKind::SensorInverted] | `(raw - offset) * scale` | reverses the sensor itself; `raw` is already direction-corrected | delegated to the sensor |
//!
//! For `SensorInverted` the recorded sign is informational: inversion has
//! already happened before the offset is removed, so an offset captured
//! before inverting no longer describes the same physical point.
//!
//! # Example
//!
//! ```rust
//! use robio_hal::encoder::EncoderChannel;
//! use robio_hal::sim::SimPositionSensor;
//!
//! let (sensor, raw) = SimPositionSensor::new("wrist_pot");
//! let mut wrist = EncoderChannel::analog("wrist", sensor);
//! wrist.set_inverted(true).unwrap();
//! wrist.set_scale_and_offset(2.0, 0.25);
//!
//! raw.set(0.75);
//! assert!((wrist.get_position().unwrap() - (-1.0)).abs() < 1e-12);
//! ```

use std::time::Duration;

use robio_types::{Calibration, RobioError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::periodic::Periodic;
use crate::revolution::RevolutionCounter;
use crate::source::RawPositionSource;

/// Backend tag selecting the calibration composition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    /// Potentiometric analog encoder reporting `0..1` of a turn.
    Analog,
    /// Digital absolute encoder in native units, no revolution tracking.
    Absolute,
    /// Sensor that owns its direction setting (e.g. a motor-integrated
    /// encoder).
    SensorInverted,
}

impl EncoderKind {
    /// `true` when position is derived from an unwrapped multi-turn value.
    pub fn is_revolution_aware(self) -> bool {
        matches!(self, EncoderKind::Analog)
    }
}

/// One physical position sensor with its calibration.
pub struct EncoderChannel {
    name: String,
    kind: EncoderKind,
    source: Box<dyn RawPositionSource>,
    calibration: Calibration,
}

impl EncoderChannel {
    /// Wrap `source` as a backend of the given kind.
    ///
    /// An [`EncoderKind::Analog`] source is expected to be revolution-aware
    /// already; use [`EncoderChannel::analog`] to add tracking to a plain
    /// wrapping source.
    pub fn new(
        name: impl Into<String>,
        kind: EncoderKind,
        source: Box<dyn RawPositionSource>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            calibration: Calibration::default(),
        }
    }

    /// Analog potentiometric encoder with revolution tracking over `[0, 1)`.
    pub fn analog<S>(name: impl Into<String>, source: S) -> Self
    where
        S: RawPositionSource + 'static,
    {
        Self::new(name, EncoderKind::Analog, Box::new(RevolutionCounter::new(source)))
    }

    /// Digital absolute encoder.
    pub fn absolute<S>(name: impl Into<String>, source: S) -> Self
    where
        S: RawPositionSource + 'static,
    {
        Self::new(name, EncoderKind::Absolute, Box::new(source))
    }

    /// Encoder whose direction is configured in the sensor.
    pub fn sensor_inverted<S>(name: impl Into<String>, source: S) -> Self
    where
        S: RawPositionSource + 'static,
    {
        Self::new(name, EncoderKind::SensorInverted, Box::new(source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EncoderKind {
        self.kind
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Backend's native reading, unmodified.
    ///
    /// # Errors
    ///
    /// Propagates the sensor read error.
    pub fn get_raw_position(&mut self) -> Result<f64, RobioError> {
        self.source.read_raw()
    }

    /// Calibrated position.
    ///
    /// # Errors
    ///
    /// Propagates the sensor read error.
    pub fn get_position(&mut self) -> Result<f64, RobioError> {
        match self.kind {
            EncoderKind::Analog => {
                let value = match self.source.read_unwrapped() {
                    Some(unwrapped) => unwrapped?,
                    None => self.source.read_raw()?,
                };
                Ok(self.calibration.apply(value))
            }
            EncoderKind::Absolute => Ok(self.calibration.apply(self.source.read_raw()?)),
            EncoderKind::SensorInverted => {
                Ok(self.calibration.apply_unsigned(self.source.read_raw()?))
            }
        }
    }

    /// Reverse the reported direction.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::UnsupportedCalibration`] for a
    /// [`EncoderKind::SensorInverted`] backend whose sensor cannot reverse
    /// direction.  The calibration is left unchanged in that case.
    pub fn set_inverted(&mut self, inverted: bool) -> Result<(), RobioError> {
        if self.kind == EncoderKind::SensorInverted {
            self.source.set_direction_reversed(inverted).map_err(|e| match e {
                RobioError::UnsupportedCalibration { .. } => {
                    RobioError::unsupported(self.name.clone(), "set_inverted")
                }
                other => other,
            })?;
        }
        self.calibration.set_inverted(inverted);
        debug!(encoder = %self.name, inverted, "direction set");
        Ok(())
    }

    /// Overwrite scale and offset.  Not validated: a zero scale is legal and
    /// pins the position at zero.
    pub fn set_scale_and_offset(&mut self, scale: f64, offset: f64) {
        self.calibration.scale = scale;
        self.calibration.offset = offset;
    }

    /// Apply a full calibration (sign, scale and offset) at once.
    ///
    /// # Errors
    ///
    /// See [`set_inverted`](Self::set_inverted).
    pub fn apply_calibration(&mut self, calibration: Calibration) -> Result<(), RobioError> {
        self.set_inverted(calibration.is_inverted())?;
        self.set_scale_and_offset(calibration.scale, calibration.offset);
        Ok(())
    }

    /// Re-zero the position at the mechanism's current location.
    ///
    /// A no-op for [`EncoderKind::Absolute`] backends, whose zero is fixed by
    /// the offset.
    ///
    /// # Errors
    ///
    /// Propagates the sensor error; a [`EncoderKind::SensorInverted`] sensor
    /// without a resettable counter reports
    /// [`RobioError::UnsupportedCalibration`].
    pub fn reset(&mut self) -> Result<(), RobioError> {
        match self.kind {
            EncoderKind::Absolute => {
                debug!(encoder = %self.name, "reset ignored by absolute encoder");
                Ok(())
            }
            EncoderKind::Analog | EncoderKind::SensorInverted => {
                self.source.zero_counter()?;
                info!(encoder = %self.name, "position re-zeroed");
                Ok(())
            }
        }
    }

    /// Refresh revolution tracking; call once per control cycle.
    ///
    /// # Errors
    ///
    /// Propagates the sensor read error.
    pub fn sample(&mut self) -> Result<(), RobioError> {
        if !self.kind.is_revolution_aware() {
            return Ok(());
        }
        if let Some(result) = self.source.read_unwrapped() {
            result?;
        }
        Ok(())
    }
}

impl Periodic for EncoderChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn periodic(&mut self, _now: Duration) -> Result<(), RobioError> {
        self.sample()
    }
}
