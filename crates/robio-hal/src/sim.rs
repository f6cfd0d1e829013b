//! In-process simulated sources for tests and headless runs.
//!
//! Each simulated device is split into the device half, handed to a
//! [`Joystick`][crate::Joystick], [`Gamepad`][crate::Gamepad] or
//! [`EncoderChannel`][crate::EncoderChannel], and a cloneable handle that
//! scripts what the device reports.  State is shared through atomics, so a
//! handle can drive a device owned by another thread.
//!
//! # Example
//!
//! ```rust
//! use robio_hal::sim::SimHid;
//! use robio_hal::source::RawButtonSource;
//!
//! let (mut hid, handle) = SimHid::new();
//! handle.press(3);
//! assert_eq!(hid.read_button_bitmask(0).unwrap(), 0b100);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use robio_types::{ButtonEvent, RobioError, RunMode};

use crate::source::{RawAxisSource, RawButtonSource, RawPositionSource, RunStateSource};
use crate::tracer::ButtonEventTracer;

/// Number of axis channels a [`SimHid`] exposes.
pub const SIM_AXIS_COUNT: usize = 8;

// ────────────────────────────────────────────────────────────────────────────
// Simulated HID
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct HidState {
    buttons: AtomicU32,
    axes: [AtomicU64; SIM_AXIS_COUNT],
    failing: AtomicBool,
}

/// A simulated joystick or gamepad.  Every port reads the same state.
pub struct SimHid {
    state: Arc<HidState>,
}

/// Scripting handle for a [`SimHid`].
#[derive(Clone)]
pub struct SimHidHandle {
    state: Arc<HidState>,
}

impl SimHid {
    /// Create a device with no buttons held and every axis centred.
    pub fn new() -> (Self, SimHidHandle) {
        let state = Arc::new(HidState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            SimHidHandle { state },
        )
    }

    fn check(&self) -> Result<(), RobioError> {
        if self.state.failing.load(Ordering::Acquire) {
            return Err(RobioError::raw_read("sim-hid", "simulated bus failure"));
        }
        Ok(())
    }
}

impl RawButtonSource for SimHid {
    fn read_button_bitmask(&mut self, _port: u8) -> Result<u32, RobioError> {
        self.check()?;
        Ok(self.state.buttons.load(Ordering::Acquire))
    }
}

impl RawAxisSource for SimHid {
    fn read_axis(&mut self, axis: u8) -> Result<f64, RobioError> {
        self.check()?;
        let slot = self
            .state
            .axes
            .get(usize::from(axis))
            .ok_or_else(|| RobioError::raw_read("sim-hid", format!("no axis channel {axis}")))?;
        Ok(f64::from_bits(slot.load(Ordering::Acquire)))
    }
}

impl SimHidHandle {
    /// Replace the whole button bitmask.
    pub fn set_buttons(&self, mask: u32) {
        self.state.buttons.store(mask, Ordering::Release);
    }

    /// Current button bitmask.
    pub fn buttons(&self) -> u32 {
        self.state.buttons.load(Ordering::Acquire)
    }

    /// Hold 1-based `button`.  Out-of-range buttons are ignored.
    pub fn press(&self, button: u32) {
        if let Some(bit) = crate::sampler::button_bit(button) {
            self.state.buttons.fetch_or(bit, Ordering::AcqRel);
        }
    }

    /// Release 1-based `button`.
    pub fn release(&self, button: u32) {
        if let Some(bit) = crate::sampler::button_bit(button) {
            self.state.buttons.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    /// Set axis channel `axis`.  Channels past [`SIM_AXIS_COUNT`] are ignored.
    pub fn set_axis(&self, axis: u8, value: f64) {
        if let Some(slot) = self.state.axes.get(usize::from(axis)) {
            slot.store(value.to_bits(), Ordering::Release);
        }
    }

    /// Make every subsequent read fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::Release);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated run state
// ────────────────────────────────────────────────────────────────────────────

/// A run-mode source whose mode can be flipped from a test or a script.
#[derive(Clone)]
pub struct SimRunState {
    mode: Arc<AtomicU8>,
}

impl SimRunState {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode: Arc::new(AtomicU8::new(encode_mode(mode))),
        }
    }

    pub fn set_mode(&self, mode: RunMode) {
        self.mode.store(encode_mode(mode), Ordering::Release);
    }
}

impl Default for SimRunState {
    fn default() -> Self {
        Self::new(RunMode::Disabled)
    }
}

impl RunStateSource for SimRunState {
    fn run_mode(&self) -> RunMode {
        match self.mode.load(Ordering::Acquire) {
            1 => RunMode::Autonomous,
            2 => RunMode::Teleop,
            3 => RunMode::Test,
            _ => RunMode::Disabled,
        }
    }
}

fn encode_mode(mode: RunMode) -> u8 {
    match mode {
        RunMode::Disabled => 0,
        RunMode::Autonomous => 1,
        RunMode::Teleop => 2,
        RunMode::Test => 3,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated position sensor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ValueState {
    bits: AtomicU64,
    failing: AtomicBool,
}

/// Scripting handle for a [`SimPositionSensor`].
#[derive(Clone)]
pub struct SimValue {
    state: Arc<ValueState>,
}

impl SimValue {
    /// Set the physical reading the sensor reports.
    pub fn set(&self, value: f64) {
        self.state.bits.store(value.to_bits(), Ordering::Release);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.state.bits.load(Ordering::Acquire))
    }

    /// Make every subsequent read fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::Release);
    }
}

/// A simulated absolute position sensor.
///
/// A plain sensor only reports its value.  One built with
/// [`SimPositionSensor::with_direction_control`] behaves like a
/// motor-integrated encoder: it can reverse its own direction and re-zero
/// its counter.
pub struct SimPositionSensor {
    id: String,
    state: Arc<ValueState>,
    controllable: bool,
    reversed: bool,
    zero: f64,
}

impl SimPositionSensor {
    pub fn new(id: impl Into<String>) -> (Self, SimValue) {
        Self::build(id.into(), false)
    }

    /// A sensor that supports direction reversal and counter zeroing.
    pub fn with_direction_control(id: impl Into<String>) -> (Self, SimValue) {
        Self::build(id.into(), true)
    }

    fn build(id: String, controllable: bool) -> (Self, SimValue) {
        let state = Arc::new(ValueState::default());
        (
            Self {
                id,
                state: Arc::clone(&state),
                controllable,
                reversed: false,
                zero: 0.0,
            },
            SimValue { state },
        )
    }

    fn physical(&self) -> Result<f64, RobioError> {
        if self.state.failing.load(Ordering::Acquire) {
            return Err(RobioError::raw_read(&self.id, "simulated sensor failure"));
        }
        Ok(f64::from_bits(self.state.bits.load(Ordering::Acquire)))
    }
}

impl RawPositionSource for SimPositionSensor {
    fn id(&self) -> &str {
        &self.id
    }

    /// Zero is a physical location, so it is removed before the direction
    /// is applied.
    fn read_raw(&mut self) -> Result<f64, RobioError> {
        let travel = self.physical()? - self.zero;
        Ok(if self.reversed { -travel } else { travel })
    }

    fn zero_counter(&mut self) -> Result<(), RobioError> {
        if !self.controllable {
            return Err(RobioError::unsupported(&self.id, "zero_counter"));
        }
        self.zero = self.physical()?;
        Ok(())
    }

    fn set_direction_reversed(&mut self, reversed: bool) -> Result<(), RobioError> {
        if !self.controllable {
            return Err(RobioError::unsupported(&self.id, "set_direction_reversed"));
        }
        self.reversed = reversed;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording tracer
// ────────────────────────────────────────────────────────────────────────────

/// A [`ButtonEventTracer`] that keeps every event in memory.
#[derive(Default)]
pub struct RecordingTracer {
    events: Mutex<Vec<(ButtonEvent, String)>>,
}

impl RecordingTracer {
    /// Snapshot of the recorded `(event, device_id)` pairs, oldest first.
    pub fn events(&self) -> Vec<(ButtonEvent, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ButtonEventTracer for RecordingTracer {
    fn record(&self, event: &ButtonEvent, device_id: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((*event, device_id.to_string()));
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
