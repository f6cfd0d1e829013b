//! Raw-sample collaborator traits.
//!
//! Hardware-access crates implement these traits on top of vendor SDKs; the
//! rest of `robio` only ever talks to the traits, so a joystick on the
//! driver station and a simulated button panel are interchangeable.
//!
//! All reads are expected to be non-blocking bus or memory reads.  A read
//! that fails returns [`RobioError::RawReadFailed`]; callers treat that as
//! fatal for the current control cycle only.

use robio_types::{RobioError, RunMode};

/// Supplies the raw button bitmask of a driver-station port.
///
/// Bit `n` of the mask is button `n + 1`.
pub trait RawButtonSource: Send {
    /// Read the current button bitmask for `port`.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::RawReadFailed`] when the port cannot be read.
    fn read_button_bitmask(&mut self, port: u8) -> Result<u32, RobioError>;
}

/// Supplies raw analog axis readings in the device's native range.
pub trait RawAxisSource: Send {
    /// Read raw axis channel `axis`.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::RawReadFailed`] when the channel cannot be read.
    fn read_axis(&mut self, axis: u8) -> Result<f64, RobioError>;
}

/// A human-interface device exposing both buttons and axes.
pub trait HidSource: RawButtonSource + RawAxisSource {}

impl<T: RawButtonSource + RawAxisSource> HidSource for T {}

/// Supplies raw readings from an absolute position sensor.
///
/// Units are backend-defined: a potentiometric sensor reports a `0..1`
/// fraction of a rotation, a digital absolute encoder reports its native
/// absolute units.
pub trait RawPositionSource: Send {
    /// Stable identifier used in errors and logs.
    fn id(&self) -> &str;

    /// Read the backend's native raw position.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::RawReadFailed`] when the sensor cannot be read.
    fn read_raw(&mut self) -> Result<f64, RobioError>;

    /// Read the unwrapped multi-turn position, for revolution-aware sources.
    ///
    /// Returns `None` when the source does not track revolutions.
    fn read_unwrapped(&mut self) -> Option<Result<f64, RobioError>> {
        None
    }

    /// Make the current physical position the new zero of the unwrapped
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::UnsupportedCalibration`] by default.
    fn zero_counter(&mut self) -> Result<(), RobioError> {
        Err(RobioError::unsupported(self.id(), "zero_counter"))
    }

    /// Reverse the sensing direction in the sensor itself.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::UnsupportedCalibration`] by default.
    fn set_direction_reversed(&mut self, _reversed: bool) -> Result<(), RobioError> {
        Err(RobioError::unsupported(self.id(), "set_direction_reversed"))
    }
}

impl<T: RawPositionSource + ?Sized> RawPositionSource for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn read_raw(&mut self) -> Result<f64, RobioError> {
        (**self).read_raw()
    }

    fn read_unwrapped(&mut self) -> Option<Result<f64, RobioError>> {
        (**self).read_unwrapped()
    }

    fn zero_counter(&mut self) -> Result<(), RobioError> {
        (**self).zero_counter()
    }

    fn set_direction_reversed(&mut self, reversed: bool) -> Result<(), RobioError> {
        (**self).set_direction_reversed(reversed)
    }
}

/// Reports the robot's current run mode.
pub trait RunStateSource: Send + Sync {
    fn run_mode(&self) -> RunMode;

    /// `true` while the robot is disabled.
    fn is_disabled(&self) -> bool {
        self.run_mode().is_disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensor {
        raw: f64,
    }

    impl RawPositionSource for FixedSensor {
        fn id(&self) -> &str {
            "fixed"
        }

        fn read_raw(&mut self) -> Result<f64, RobioError> {
            Ok(self.raw)
        }
    }

    struct FixedRunState(RunMode);

    impl RunStateSource for FixedRunState {
        fn run_mode(&self) -> RunMode {
            self.0
        }
    }

    #[test]
    fn optional_position_capabilities_default_to_unsupported() {
        let mut sensor = FixedSensor { raw: 0.5 };
        assert!(sensor.read_unwrapped().is_none());
        assert!(matches!(
            sensor.zero_counter(),
            Err(RobioError::UnsupportedCalibration { .. })
        ));
        assert!(matches!(
            sensor.set_direction_reversed(true),
            Err(RobioError::UnsupportedCalibration { .. })
        ));
    }

    #[test]
    fn boxed_source_forwards_reads() {
        let mut boxed: Box<dyn RawPositionSource> = Box::new(FixedSensor { raw: 0.25 });
        assert_eq!(boxed.id(), "fixed");
        assert!((boxed.read_raw().unwrap() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn run_state_disabled_follows_mode() {
        assert!(FixedRunState(RunMode::Disabled).is_disabled());
        assert!(!FixedRunState(RunMode::Teleop).is_disabled());
    }
}
