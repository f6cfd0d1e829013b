//! Analog axis shaping: deadband suppression followed by an optional
//! sign-preserving square curve.
//!
//! Shaping is a pure function applied on demand; it is not gated by the
//! sampling period.
//!
//! # Example
//!
//! ```rust
//! use robio_hal::shaper::{shape, AxisShapingPolicy};
//!
//! assert_eq!(shape(0.05, 0.15, false), 0.0);
//! assert_eq!(shape(-0.5, 0.15, true), -0.25);
//!
//! let policy = AxisShapingPolicy::new(0.1, true).unwrap();
//! assert_eq!(policy.apply(0.5), 0.25);
//! ```

use robio_types::RobioError;
use serde::{Deserialize, Serialize};

/// Deadband applied by input devices when none is configured.
pub const DEFAULT_DEADBAND: f64 = 0.15;

/// Shape a raw axis reading.
///
/// Values with `|value| < deadband` become exactly `0.0`.  When `squared` is
/// set the surviving value is replaced by `sign(v) * v²`.  The input range is
/// not constrained; callers clamp upstream if they need to.
pub fn shape(value: f64, deadband: f64, squared: bool) -> f64 {
    let v = if value.abs() >= deadband { value } else { 0.0 };
    if squared { sign(v) * v * v } else { v }
}

// Unlike f64::signum, zero maps to zero (and -0.0 never leaks out).
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Deadband threshold plus squared-curve flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisShapingPolicy {
    deadband: f64,
    squared: bool,
}

impl Default for AxisShapingPolicy {
    fn default() -> Self {
        Self {
            deadband: DEFAULT_DEADBAND,
            squared: false,
        }
    }
}

impl AxisShapingPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::InvalidDeadband`] unless `0 <= deadband < 1`.
    pub fn new(deadband: f64, squared: bool) -> Result<Self, RobioError> {
        validate_deadband(deadband)?;
        Ok(Self { deadband, squared })
    }

    pub fn deadband(&self) -> f64 {
        self.deadband
    }

    pub fn squared(&self) -> bool {
        self.squared
    }

    /// Same deadband, different curve.
    pub fn with_squared(self, squared: bool) -> Self {
        Self { squared, ..self }
    }

    pub fn apply(&self, value: f64) -> f64 {
        shape(value, self.deadband, self.squared)
    }
}

/// Check that `deadband` lies in `[0, 1)`.
///
/// # Errors
///
/// Returns [`RobioError::InvalidDeadband`] otherwise (including NaN).
pub fn validate_deadband(deadband: f64) -> Result<(), RobioError> {
    if (0.0..1.0).contains(&deadband) {
        Ok(())
    } else {
        Err(RobioError::InvalidDeadband(deadband))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_inside_deadband_is_zeroed() {
        assert_eq!(shape(0.05, 0.15, false), 0.0);
        assert_eq!(shape(-0.149, 0.15, false), 0.0);
        assert_eq!(shape(0.05, 0.15, true), 0.0);
    }

    #[test]
    fn deadband_boundary_is_inclusive() {
        assert_eq!(shape(0.15, 0.15, false), 0.15);
        assert_eq!(shape(-0.15, 0.15, false), -0.15);
    }

    #[test]
    fn squared_curve_preserves_sign() {
        assert_eq!(shape(0.5, 0.15, true), 0.25);
        assert_eq!(shape(-0.5, 0.15, true), -0.25);
        assert_eq!(shape(1.0, 0.15, true), 1.0);
        assert_eq!(shape(-1.0, 0.15, true), -1.0);
    }

    #[test]
    fn zeroed_value_is_positive_zero() {
        let out = shape(-0.01, 0.15, true);
        assert_eq!(out, 0.0);
        assert!(out.is_sign_positive());

        // -0.0 passes a zero deadband but must not come out negative when squared.
        let out = shape(-0.0, 0.0, true);
        assert!(out.is_sign_positive());
    }

    #[test]
    fn squared_magnitude_is_square_of_linear_output() {
        let d = 0.1;
        for i in -20..=20 {
            let v = f64::from(i) * 0.05;
            let linear = shape(v, d, false);
            let squared = shape(v, d, true);
            assert!((squared.abs() - linear * linear).abs() < 1e-12, "v = {v}");
            if linear != 0.0 {
                assert_eq!(squared.signum(), v.signum(), "v = {v}");
            }
            assert_eq!(linear == 0.0, v.abs() < d, "v = {v}");
        }
    }

    #[test]
    fn output_magnitude_is_monotonic_outside_deadband() {
        for squared in [false, true] {
            let mut prev = 0.0;
            for i in 3..=40 {
                let v = f64::from(i) * 0.05;
                let out = shape(v, 0.15, squared);
                assert!(out >= prev, "not monotonic at {v} (squared = {squared})");
                prev = out;
            }
        }
    }

    #[test]
    fn unconstrained_input_is_passed_through() {
        assert_eq!(shape(3.0, 0.15, false), 3.0);
        assert_eq!(shape(-3.0, 0.15, true), -9.0);
    }

    #[test]
    fn policy_rejects_out_of_range_deadband() {
        assert!(matches!(
            AxisShapingPolicy::new(1.0, false),
            Err(RobioError::InvalidDeadband(_))
        ));
        assert!(matches!(
            AxisShapingPolicy::new(-0.1, false),
            Err(RobioError::InvalidDeadband(_))
        ));
        assert!(AxisShapingPolicy::new(f64::NAN, false).is_err());
        assert!(AxisShapingPolicy::new(0.0, true).is_ok());
    }

    #[test]
    fn default_policy_uses_default_deadband() {
        let policy = AxisShapingPolicy::default();
        assert_eq!(policy.deadband(), DEFAULT_DEADBAND);
        assert!(!policy.squared());
        assert_eq!(policy.apply(0.1), 0.0);
        assert_eq!(policy.with_squared(true).apply(-0.5), -0.25);
    }
}
