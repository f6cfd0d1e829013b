//! [`Gamepad`] – Xbox-style controller with two sticks and two triggers.

use std::sync::Arc;
use std::time::Duration;

use robio_types::RobioError;

use crate::periodic::Periodic;
use crate::sampler::{ButtonHandler, ButtonSampler, button_bit};
use crate::shaper::{AxisShapingPolicy, DEFAULT_DEADBAND, shape, validate_deadband};
use crate::source::{HidSource, RunStateSource};
use crate::tracer::ButtonEventTracer;

pub const BUTTON_A: u32 = 1;
pub const BUTTON_B: u32 = 2;
pub const BUTTON_X: u32 = 3;
pub const BUTTON_Y: u32 = 4;
pub const LEFT_BUMPER: u32 = 5;
pub const RIGHT_BUMPER: u32 = 6;
pub const BACK: u32 = 7;
pub const START: u32 = 8;
pub const LEFT_STICK_BUTTON: u32 = 9;
pub const RIGHT_STICK_BUTTON: u32 = 10;

/// Analog channels of a gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamepadAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl GamepadAxis {
    pub fn channel(self) -> u8 {
        match self {
            GamepadAxis::LeftX => 0,
            GamepadAxis::LeftY => 1,
            GamepadAxis::LeftTrigger => 2,
            GamepadAxis::RightTrigger => 3,
            GamepadAxis::RightX => 4,
            GamepadAxis::RightY => 5,
        }
    }
}

/// A gamepad bound to one driver-station port.
///
/// Button handling is the same [`ButtonSampler`] a [`Joystick`][crate::Joystick]
/// uses; only the axis layout differs.
pub struct Gamepad {
    sampler: ButtonSampler,
    source: Box<dyn HidSource>,
    run_state: Arc<dyn RunStateSource>,
    deadband: f64,
    left_y_sign: f64,
    right_y_sign: f64,
}

impl Gamepad {
    pub fn new(
        name: impl Into<String>,
        port: u8,
        source: Box<dyn HidSource>,
        run_state: Arc<dyn RunStateSource>,
    ) -> Self {
        Self {
            sampler: ButtonSampler::new(name, port),
            source,
            run_state,
            deadband: DEFAULT_DEADBAND,
            left_y_sign: 1.0,
            right_y_sign: 1.0,
        }
    }

    /// # Errors
    ///
    /// Returns [`RobioError::InvalidDeadband`] unless `0 <= deadband < 1`.
    pub fn with_deadband(mut self, deadband: f64) -> Result<Self, RobioError> {
        validate_deadband(deadband)?;
        self.deadband = deadband;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        self.sampler.device_id()
    }

    pub fn port(&self) -> u8 {
        self.sampler.port()
    }

    pub fn deadband(&self) -> f64 {
        self.deadband
    }

    pub fn set_button_handler(&mut self, handler: impl ButtonHandler + 'static) {
        self.sampler.set_button_handler(Box::new(handler));
    }

    pub fn clear_button_handler(&mut self) -> Option<Box<dyn ButtonHandler>> {
        self.sampler.clear_button_handler()
    }

    pub fn has_button_handler(&self) -> bool {
        self.sampler.is_active()
    }

    pub fn set_event_tracer(&mut self, tracer: Option<Arc<dyn ButtonEventTracer>>) {
        self.sampler.set_event_tracer(tracer);
    }

    pub fn set_sampling_period(&mut self, period: Duration) {
        self.sampler.set_sampling_period(period);
    }

    pub fn sampler(&self) -> &ButtonSampler {
        &self.sampler
    }

    pub fn set_left_y_inverted(&mut self, inverted: bool) {
        self.left_y_sign = if inverted { -1.0 } else { 1.0 };
    }

    pub fn set_right_y_inverted(&mut self, inverted: bool) {
        self.right_y_sign = if inverted { -1.0 } else { 1.0 };
    }

    /// # Errors
    ///
    /// Propagates a failed button read; see [`ButtonSampler::poll`].
    pub fn poll(&mut self, now: Duration) -> Result<usize, RobioError> {
        self.sampler.poll(now, self.source.as_mut(), self.run_state.as_ref())
    }

    /// # Errors
    ///
    /// Propagates a failed button read.
    pub fn is_button_pressed(&mut self, button: u32) -> Result<bool, RobioError> {
        let port = self.port();
        let mask = self.source.read_button_bitmask(port)?;
        Ok(button_bit(button).is_some_and(|bit| mask & bit != 0))
    }

    /// Raw reading of `axis`, with the configured Y inversions applied.
    ///
    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn axis(&mut self, axis: GamepadAxis) -> Result<f64, RobioError> {
        let value = self.source.read_axis(axis.channel())?;
        Ok(match axis {
            GamepadAxis::LeftY => self.left_y_sign * value,
            GamepadAxis::RightY => self.right_y_sign * value,
            _ => value,
        })
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn axis_with_deadband(
        &mut self,
        axis: GamepadAxis,
        squared: bool,
    ) -> Result<f64, RobioError> {
        let deadband = self.deadband;
        Ok(shape(self.axis(axis)?, deadband, squared))
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn axis_shaped(
        &mut self,
        axis: GamepadAxis,
        policy: AxisShapingPolicy,
    ) -> Result<f64, RobioError> {
        Ok(policy.apply(self.axis(axis)?))
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn left_x(&mut self) -> Result<f64, RobioError> {
        self.axis(GamepadAxis::LeftX)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn left_y(&mut self) -> Result<f64, RobioError> {
        self.axis(GamepadAxis::LeftY)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn right_x(&mut self) -> Result<f64, RobioError> {
        self.axis(GamepadAxis::RightX)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn right_y(&mut self) -> Result<f64, RobioError> {
        self.axis(GamepadAxis::RightY)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn left_trigger(&mut self) -> Result<f64, RobioError> {
        self.axis(GamepadAxis::LeftTrigger)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn right_trigger(&mut self) -> Result<f64, RobioError> {
        self.axis(GamepadAxis::RightTrigger)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn left_x_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(GamepadAxis::LeftX, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn left_y_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(GamepadAxis::LeftY, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn right_x_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(GamepadAxis::RightX, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn right_y_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(GamepadAxis::RightY, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn left_trigger_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(GamepadAxis::LeftTrigger, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn right_trigger_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(GamepadAxis::RightTrigger, squared)
    }
}

impl Periodic for Gamepad {
    fn name(&self) -> &str {
        self.sampler.device_id()
    }

    fn periodic(&mut self, now: Duration) -> Result<(), RobioError> {
        self.poll(now).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use robio_types::{ButtonEvent, RunMode};

    use crate::sim::{RecordingTracer, SimHid, SimHidHandle, SimRunState};

    fn pad() -> (Gamepad, SimHidHandle) {
        let (hid, handle) = SimHid::new();
        let run_state = SimRunState::new(RunMode::Teleop);
        (
            Gamepad::new("operator", 1, Box::new(hid), Arc::new(run_state)),
            handle,
        )
    }

    #[test]
    fn axis_channels_follow_xbox_layout() {
        let (mut pad, handle) = pad();
        for (i, axis) in [
            GamepadAxis::LeftX,
            GamepadAxis::LeftY,
            GamepadAxis::LeftTrigger,
            GamepadAxis::RightTrigger,
            GamepadAxis::RightX,
            GamepadAxis::RightY,
        ]
        .into_iter()
        .enumerate()
        {
            assert_eq!(usize::from(axis.channel()), i);
            handle.set_axis(axis.channel(), 0.1 * (i as f64 + 1.0));
        }
        assert!((pad.axis(GamepadAxis::RightY).unwrap() - 0.6).abs() < 1e-12);
        assert!((pad.axis(GamepadAxis::LeftTrigger).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(pad.left_x().unwrap(), pad.axis(GamepadAxis::LeftX).unwrap());
        assert_eq!(pad.right_trigger().unwrap(), pad.axis(GamepadAxis::RightTrigger).unwrap());
        assert_eq!(pad.right_x().unwrap(), pad.axis(GamepadAxis::RightX).unwrap());
    }

    #[test]
    fn y_axes_invert_independently() {
        let (mut pad, handle) = pad();
        handle.set_axis(GamepadAxis::LeftY.channel(), -0.5);
        handle.set_axis(GamepadAxis::RightY.channel(), -0.5);
        pad.set_left_y_inverted(true);

        assert_eq!(pad.left_y_with_deadband(true).unwrap(), 0.25);
        assert_eq!(pad.right_y_with_deadband(true).unwrap(), -0.25);

        pad.set_right_y_inverted(true);
        assert_eq!(pad.right_y_with_deadband(false).unwrap(), 0.5);
    }

    #[test]
    fn triggers_and_sticks_use_device_deadband() {
        let (pad, handle) = pad();
        let mut pad = pad.with_deadband(0.2).unwrap();
        handle.set_axis(GamepadAxis::LeftTrigger.channel(), 0.19);
        handle.set_axis(GamepadAxis::RightTrigger.channel(), 0.8);
        handle.set_axis(GamepadAxis::LeftX.channel(), -0.05);
        handle.set_axis(GamepadAxis::RightX.channel(), 0.5);

        assert_eq!(pad.left_trigger_with_deadband(false).unwrap(), 0.0);
        assert!((pad.right_trigger_with_deadband(true).unwrap() - 0.64).abs() < 1e-12);
        assert_eq!(pad.left_x_with_deadband(true).unwrap(), 0.0);
        assert_eq!(pad.right_x_with_deadband(true).unwrap(), 0.25);

        let loose = AxisShapingPolicy::new(0.0, false).unwrap();
        assert_eq!(pad.axis_shaped(GamepadAxis::LeftX, loose).unwrap(), -0.05);
    }

    #[test]
    fn press_and_release_round_trip_with_tracing() {
        let (mut pad, handle) = pad();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        pad.set_button_handler(move |ev: ButtonEvent| {
            sink.lock().unwrap().push((ev.button, ev.pressed));
        });
        let tracer = Arc::new(RecordingTracer::default());
        pad.set_event_tracer(Some(tracer.clone()));

        pad.poll(Duration::ZERO).unwrap();
        handle.press(BUTTON_A);
        handle.press(START);
        pad.poll(Duration::from_millis(20)).unwrap();
        handle.release(BUTTON_A);
        pad.poll(Duration::from_millis(40)).unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![(BUTTON_A, true), (START, true), (BUTTON_A, false)]
        );
        assert_eq!(tracer.events().len(), 3);
        assert!(tracer.events().iter().all(|(_, id)| id == "operator"));
        assert!(pad.is_button_pressed(START).unwrap());
        assert!(!pad.is_button_pressed(BUTTON_A).unwrap());
    }

    #[test]
    fn clearing_handler_stops_sampling() {
        let (mut pad, handle) = pad();
        pad.set_button_handler(|_ev: ButtonEvent| {});
        pad.poll(Duration::ZERO).unwrap();
        assert!(pad.clear_button_handler().is_some());
        assert!(!pad.has_button_handler());

        handle.press(BUTTON_B);
        assert_eq!(pad.poll(Duration::from_millis(20)).unwrap(), 0);
        assert_eq!(pad.sampler().previous_mask(), 0);
    }

    #[test]
    fn slower_sampling_period_collapses_fast_taps() {
        let (mut pad, handle) = pad();
        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        pad.set_button_handler(move |_ev: ButtonEvent| *sink.lock().unwrap() += 1);
        pad.set_sampling_period(Duration::from_millis(100));

        pad.poll(Duration::ZERO).unwrap();
        // Tap and release between samples: net change is zero.
        handle.press(BUTTON_Y);
        pad.poll(Duration::from_millis(20)).unwrap();
        handle.release(BUTTON_Y);
        pad.poll(Duration::from_millis(100)).unwrap();
        assert_eq!(*count.lock().unwrap(), 0);
    }
}
