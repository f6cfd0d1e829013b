//! Per-cycle hook for devices that must be serviced by the control loop.

use std::time::Duration;

use robio_types::RobioError;

/// A device that needs to run once per control cycle (button sampling,
/// revolution tracking, …).
pub trait Periodic: Send {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    /// Service the device for the cycle starting at robot time `now`.
    ///
    /// # Errors
    ///
    /// Returns the device's raw-read error; the failure only affects this
    /// cycle.
    fn periodic(&mut self, now: Duration) -> Result<(), RobioError>;
}
