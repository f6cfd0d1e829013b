//! [`RevolutionCounter`] – continuous multi-turn position from a wrapping
//! sensor.
//!
//! A potentiometric absolute encoder reports a fraction of one turn that
//! wraps from the top of its range back to the bottom.  The counter watches
//! consecutive samples; a jump larger than half the range is a crossover
//! and moves the revolution count by one.  The unwrapped value is
//! `revolutions * range + (raw - min) - zero`.
//!
//! Crossovers are only detected reliably if the mechanism moves less than
//! half a turn between two samples, so the counter must be sampled at least
//! once per control cycle (see [`RevolutionCounter::sample`]).
//!
//! # Example
//!
//! ```rust
//! use robio_hal::revolution::RevolutionCounter;
//! use robio_hal::sim::SimPositionSensor;
//! use robio_hal::source::RawPositionSource;
//!
//! let (sensor, raw) = SimPositionSensor::new("arm_pot");
//! let mut counter = RevolutionCounter::new(sensor);
//!
//! raw.set(0.9);
//! counter.sample().unwrap();
//! raw.set(0.1); // wrapped forward past the top of the range
//! let turns = counter.read_unwrapped().unwrap().unwrap();
//! assert!((turns - 1.1).abs() < 1e-9);
//! ```

use std::cmp::Ordering;

use robio_types::RobioError;
use tracing::debug;

use crate::source::RawPositionSource;

/// Revolution-tracking wrapper around a wrapping raw source.
pub struct RevolutionCounter<S> {
    source: S,
    min: f64,
    max: f64,
    enabled: bool,
    revolutions: i64,
    previous: Option<f64>,
    zero: f64,
}

impl<S: RawPositionSource> RevolutionCounter<S> {
    /// Track revolutions of `source` over the normalized range `[0, 1)`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            min: 0.0,
            max: 1.0,
            enabled: true,
            revolutions: 0,
            previous: None,
            zero: 0.0,
        }
    }

    /// Track revolutions over `[min, max)` instead.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::Config`] unless `max > min`.
    pub fn with_range(mut self, min: f64, max: f64) -> Result<Self, RobioError> {
        if max.partial_cmp(&min) != Some(Ordering::Greater) {
            return Err(RobioError::Config(format!(
                "revolution range [{min}, {max}) of {} is empty",
                self.source.id()
            )));
        }
        self.min = min;
        self.max = max;
        Ok(self)
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Completed revolutions since the last zeroing.
    pub fn revolutions(&self) -> i64 {
        self.revolutions
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable revolution tracking.
    ///
    /// While disabled the raw value is passed through and no crossovers are
    /// counted.  Re-enabling takes the next sample as a fresh baseline.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.previous = None;
        }
        self.enabled = enabled;
    }

    /// Read the source once and update the revolution count.
    ///
    /// # Errors
    ///
    /// Propagates the source's read error.
    pub fn sample(&mut self) -> Result<f64, RobioError> {
        let raw = self.source.read_raw()?;
        if !self.enabled {
            return Ok(raw);
        }
        Ok(self.track(raw))
    }

    pub fn inner(&self) -> &S {
        &self.source
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn track(&mut self, raw: f64) -> f64 {
        let range = self.max - self.min;
        if let Some(previous) = self.previous {
            let delta = raw - previous;
            if delta < -range / 2.0 {
                self.revolutions += 1;
                let revolutions = self.revolutions;
                debug!(sensor = self.source.id(), revolutions, "forward crossover");
            } else if delta > range / 2.0 {
                self.revolutions -= 1;
                let revolutions = self.revolutions;
                debug!(sensor = self.source.id(), revolutions, "reverse crossover");
            }
        }
        self.previous = Some(raw);
        self.revolutions as f64 * range + (raw - self.min) - self.zero
    }
}

impl<S: RawPositionSource> RawPositionSource for RevolutionCounter<S> {
    fn id(&self) -> &str {
        self.source.id()
    }

    fn read_raw(&mut self) -> Result<f64, RobioError> {
        self.source.read_raw()
    }

    fn read_unwrapped(&mut self) -> Option<Result<f64, RobioError>> {
        Some(self.sample())
    }

    /// Makes the current physical position read as zero.
    fn zero_counter(&mut self) -> Result<(), RobioError> {
        let raw = self.source.read_raw()?;
        self.revolutions = 0;
        self.previous = Some(raw);
        self.zero = raw - self.min;
        Ok(())
    }

    fn set_direction_reversed(&mut self, reversed: bool) -> Result<(), RobioError> {
        self.source.set_direction_reversed(reversed)
    }
}
