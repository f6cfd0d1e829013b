//! [`Joystick`] – flight-stick style input device.
//!
//! Combines a shared [`ButtonSampler`] with deadband-shaped stick accessors.
//! The Y axis can be inverted so that pushing the stick forward reads as a
//! positive value.

use std::sync::Arc;
use std::time::Duration;

use robio_types::RobioError;

use crate::periodic::Periodic;
use crate::sampler::{ButtonHandler, ButtonSampler, button_bit};
use crate::shaper::{AxisShapingPolicy, DEFAULT_DEADBAND, shape, validate_deadband};
use crate::source::{HidSource, RunStateSource};
use crate::tracer::ButtonEventTracer;

// Logitech Attack / Extreme 3D joystick.
pub const LOGITECH_TRIGGER: u32 = 1;
pub const LOGITECH_BUTTON2: u32 = 2;
pub const LOGITECH_BUTTON3: u32 = 3;
pub const LOGITECH_BUTTON4: u32 = 4;
pub const LOGITECH_BUTTON5: u32 = 5;
pub const LOGITECH_BUTTON6: u32 = 6;
pub const LOGITECH_BUTTON7: u32 = 7;
pub const LOGITECH_BUTTON8: u32 = 8;
pub const LOGITECH_BUTTON9: u32 = 9;
pub const LOGITECH_BUTTON10: u32 = 10;
pub const LOGITECH_BUTTON11: u32 = 11;
pub const LOGITECH_BUTTON12: u32 = 12;

// Logitech DualAction game controller in joystick mode.
pub const DUALACTION_BUTTON_X: u32 = 1;
pub const DUALACTION_BUTTON_A: u32 = 2;
pub const DUALACTION_BUTTON_B: u32 = 3;
pub const DUALACTION_BUTTON_Y: u32 = 4;
pub const DUALACTION_LB: u32 = 5;
pub const DUALACTION_RB: u32 = 6;
pub const DUALACTION_LT: u32 = 7;
pub const DUALACTION_RT: u32 = 8;
pub const DUALACTION_BACK: u32 = 9;
pub const DUALACTION_START: u32 = 10;
pub const DUALACTION_LTOP: u32 = 11;
pub const DUALACTION_RTOP: u32 = 12;

// Microsoft SideWinder joystick.
pub const SIDEWINDER_TRIGGER: u32 = 1;
pub const SIDEWINDER_BUTTON2: u32 = 2;
pub const SIDEWINDER_BUTTON3: u32 = 3;
pub const SIDEWINDER_BUTTON4: u32 = 4;
pub const SIDEWINDER_BUTTON5: u32 = 5;
pub const SIDEWINDER_BUTTON6: u32 = 6;
pub const SIDEWINDER_BUTTON7: u32 = 7;
pub const SIDEWINDER_BUTTON8: u32 = 8;
pub const SIDEWINDER_BUTTON9: u32 = 9;

// Generic USB button panel.
pub const PANEL_BUTTON_RED1: u32 = 1;
pub const PANEL_BUTTON_GREEN1: u32 = 2;
pub const PANEL_BUTTON_BLUE1: u32 = 3;
pub const PANEL_BUTTON_YELLOW1: u32 = 4;
pub const PANEL_BUTTON_WHITE1: u32 = 5;
pub const PANEL_BUTTON_RED2: u32 = 6;
pub const PANEL_BUTTON_GREEN2: u32 = 7;
pub const PANEL_BUTTON_BLUE2: u32 = 8;
pub const PANEL_BUTTON_YELLOW2: u32 = 9;
pub const PANEL_BUTTON_WHITE2: u32 = 10;

// Generic USB switch panel.
pub const PANEL_SWITCH_WHITE1: u32 = 1;
pub const PANEL_SWITCH_RED1: u32 = 2;
pub const PANEL_SWITCH_GREEN1: u32 = 3;
pub const PANEL_SWITCH_BLUE1: u32 = 4;
pub const PANEL_SWITCH_YELLOW1: u32 = 5;
pub const PANEL_SWITCH_WHITE2: u32 = 6;
pub const PANEL_SWITCH_RED2: u32 = 7;
pub const PANEL_SWITCH_GREEN2: u32 = 8;
pub const PANEL_SWITCH_BLUE2: u32 = 9;
pub const PANEL_SWITCH_YELLOW2: u32 = 10;

/// Analog channels of a joystick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoystickAxis {
    X,
    Y,
    Z,
    Twist,
    Throttle,
}

impl JoystickAxis {
    /// Raw axis channel on the driver station.  Z and Twist share a channel.
    pub fn channel(self) -> u8 {
        match self {
            JoystickAxis::X => 0,
            JoystickAxis::Y => 1,
            JoystickAxis::Z | JoystickAxis::Twist => 2,
            JoystickAxis::Throttle => 3,
        }
    }
}

/// A joystick bound to one driver-station port.
pub struct Joystick {
    sampler: ButtonSampler,
    source: Box<dyn HidSource>,
    run_state: Arc<dyn RunStateSource>,
    deadband: f64,
    y_sign: f64,
}

impl Joystick {
    /// Bind a joystick named `name` to `port`.
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
            y_sign: 1.0,
        }
    }

    /// Replace the default deadband used by the `*_with_deadband` accessors.
    ///
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

    /// Register the button handler; activates button sampling.
    pub fn set_button_handler(&mut self, handler: impl ButtonHandler + 'static) {
        self.sampler.set_button_handler(Box::new(handler));
    }

    /// Remove the button handler; deactivates button sampling.
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

    /// Invert the Y axis.
    pub fn set_y_inverted(&mut self, inverted: bool) {
        self.y_sign = if inverted { -1.0 } else { 1.0 };
    }

    /// Sample buttons and dispatch events if the sampling period elapsed.
    ///
    /// # Errors
    ///
    /// Propagates a failed button read; see [`ButtonSampler::poll`].
    pub fn poll(&mut self, now: Duration) -> Result<usize, RobioError> {
        self.sampler.poll(now, self.source.as_mut(), self.run_state.as_ref())
    }

    /// Live state of 1-based `button`; out-of-range buttons read `false`.
    ///
    /// # Errors
    ///
    /// Propagates a failed button read.
    pub fn is_button_pressed(&mut self, button: u32) -> Result<bool, RobioError> {
        let port = self.port();
        let mask = self.source.read_button_bitmask(port)?;
        Ok(button_bit(button).is_some_and(|bit| mask & bit != 0))
    }

    /// Raw reading of `axis`; Y honours [`set_y_inverted`](Self::set_y_inverted).
    ///
    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn axis(&mut self, axis: JoystickAxis) -> Result<f64, RobioError> {
        let value = self.source.read_axis(axis.channel())?;
        Ok(if axis == JoystickAxis::Y {
            self.y_sign * value
        } else {
            value
        })
    }

    /// `axis` shaped with the device deadband.
    ///
    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn axis_with_deadband(
        &mut self,
        axis: JoystickAxis,
        squared: bool,
    ) -> Result<f64, RobioError> {
        let deadband = self.deadband;
        Ok(shape(self.axis(axis)?, deadband, squared))
    }

    /// `axis` shaped with an explicit policy.
    ///
    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn axis_shaped(
        &mut self,
        axis: JoystickAxis,
        policy: AxisShapingPolicy,
    ) -> Result<f64, RobioError> {
        Ok(policy.apply(self.axis(axis)?))
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn x(&mut self) -> Result<f64, RobioError> {
        self.axis(JoystickAxis::X)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn y(&mut self) -> Result<f64, RobioError> {
        self.axis(JoystickAxis::Y)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn z(&mut self) -> Result<f64, RobioError> {
        self.axis(JoystickAxis::Z)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn twist(&mut self) -> Result<f64, RobioError> {
        self.axis(JoystickAxis::Twist)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn throttle(&mut self) -> Result<f64, RobioError> {
        self.axis(JoystickAxis::Throttle)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn x_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(JoystickAxis::X, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn y_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(JoystickAxis::Y, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn z_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(JoystickAxis::Z, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn twist_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(JoystickAxis::Twist, squared)
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn throttle_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        self.axis_with_deadband(JoystickAxis::Throttle, squared)
    }

    /// Stick deflection `sqrt(x² + y²)`, from the uninverted axes.
    ///
    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn magnitude(&mut self) -> Result<f64, RobioError> {
        let (x, y) = self.raw_xy()?;
        Ok(x.hypot(y))
    }

    /// Stick direction in radians, clockwise from forward.
    ///
    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn direction_radians(&mut self) -> Result<f64, RobioError> {
        let (x, y) = self.raw_xy()?;
        Ok(x.atan2(-y))
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn direction_degrees(&mut self) -> Result<f64, RobioError> {
        Ok(self.direction_radians()?.to_degrees())
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn magnitude_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        let deadband = self.deadband;
        Ok(shape(self.magnitude()?, deadband, squared))
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn direction_radians_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        let deadband = self.deadband;
        Ok(shape(self.direction_radians()?, deadband, squared))
    }

    /// # Errors
    ///
    /// Propagates a failed axis read.
    pub fn direction_degrees_with_deadband(&mut self, squared: bool) -> Result<f64, RobioError> {
        let deadband = self.deadband;
        Ok(shape(self.direction_degrees()?, deadband, squared))
    }

    fn raw_xy(&mut self) -> Result<(f64, f64), RobioError> {
        let x = self.source.read_axis(JoystickAxis::X.channel())?;
        let y = self.source.read_axis(JoystickAxis::Y.channel())?;
        Ok((x, y))
    }
}

impl Periodic for Joystick {
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

    use crate::sim::{SimHid, SimRunState};

    fn stick() -> (Joystick, crate::sim::SimHidHandle, SimRunState) {
        let (hid, handle) = SimHid::new();
        let run_state = SimRunState::new(RunMode::Teleop);
        let js = Joystick::new("driver", 0, Box::new(hid), Arc::new(run_state.clone()));
        (js, handle, run_state)
    }

    #[test]
    fn shaped_axes_apply_default_deadband() {
        let (mut js, handle, _) = stick();
        handle.set_axis(JoystickAxis::X.channel(), 0.1);
        handle.set_axis(JoystickAxis::Y.channel(), -0.5);

        assert_eq!(js.deadband(), DEFAULT_DEADBAND);
        assert_eq!(js.x_with_deadband(false).unwrap(), 0.0);
        assert_eq!(js.y_with_deadband(true).unwrap(), -0.25);
    }

    #[test]
    fn y_inversion_flips_sign() {
        let (mut js, handle, _) = stick();
        handle.set_axis(JoystickAxis::Y.channel(), -0.5);
        js.set_y_inverted(true);
        assert_eq!(js.axis(JoystickAxis::Y).unwrap(), 0.5);
        assert_eq!(js.y_with_deadband(true).unwrap(), 0.25);
        // X is unaffected.
        handle.set_axis(JoystickAxis::X.channel(), -0.5);
        assert_eq!(js.axis(JoystickAxis::X).unwrap(), -0.5);
    }

    #[test]
    fn custom_deadband_is_validated() {
        let (js, _, _) = stick();
        assert!(js.with_deadband(1.2).is_err());

        let (js, handle, _) = stick();
        let mut js = js.with_deadband(0.3).unwrap();
        handle.set_axis(JoystickAxis::Throttle.channel(), 0.25);
        assert_eq!(js.axis_with_deadband(JoystickAxis::Throttle, false).unwrap(), 0.0);
    }

    #[test]
    fn explicit_policy_overrides_device_deadband() {
        let (mut js, handle, _) = stick();
        handle.set_axis(JoystickAxis::Twist.channel(), 0.1);
        let policy = AxisShapingPolicy::new(0.05, false).unwrap();
        assert_eq!(js.axis_shaped(JoystickAxis::Twist, policy).unwrap(), 0.1);
        assert_eq!(js.axis(JoystickAxis::Z).unwrap(), 0.1, "Z and Twist share a channel");
        assert_eq!(js.twist().unwrap(), js.z().unwrap());
        assert_eq!(js.twist_with_deadband(false).unwrap(), 0.0);
    }

    #[test]
    fn magnitude_and_direction_from_stick_position() {
        let (mut js, handle, _) = stick();
        // Full right.
        handle.set_axis(0, 1.0);
        handle.set_axis(1, 0.0);
        assert!((js.magnitude().unwrap() - 1.0).abs() < 1e-12);
        assert!((js.direction_degrees().unwrap() - 90.0).abs() < 1e-9);

        // Forward (raw Y negative), inversion must not change direction.
        js.set_y_inverted(true);
        handle.set_axis(0, 0.0);
        handle.set_axis(1, -0.6);
        assert!((js.magnitude().unwrap() - 0.6).abs() < 1e-12);
        assert!(js.direction_radians().unwrap().abs() < 1e-12);

        handle.set_axis(1, -0.1);
        assert_eq!(js.magnitude_with_deadband(false).unwrap(), 0.0);
    }

    #[test]
    fn buttons_dispatch_through_shared_sampler() {
        let (mut js, handle, _) = stick();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        js.set_button_handler(move |ev: ButtonEvent| sink.lock().unwrap().push(ev));
        assert!(js.has_button_handler());

        js.poll(Duration::ZERO).unwrap();
        handle.press(LOGITECH_TRIGGER);
        handle.press(LOGITECH_BUTTON3);
        assert_eq!(js.poll(Duration::from_millis(20)).unwrap(), 2);

        let got = events.lock().unwrap().clone();
        assert_eq!(got[0].button, LOGITECH_TRIGGER);
        assert_eq!(got[1].button, LOGITECH_BUTTON3);
        assert!(got.iter().all(|ev| ev.pressed));
    }

    #[test]
    fn disabled_run_state_suppresses_events() {
        let (mut js, handle, run_state) = stick();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        js.set_button_handler(move |ev: ButtonEvent| sink.lock().unwrap().push(ev));
        js.poll(Duration::ZERO).unwrap();

        run_state.set_mode(RunMode::Disabled);
        handle.set_buttons(0b0101);
        assert_eq!(js.poll(Duration::from_millis(20)).unwrap(), 0);
        assert_eq!(js.sampler().previous_mask(), 0b0101);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn is_button_pressed_reads_live_state() {
        let (mut js, handle, _) = stick();
        handle.press(SIDEWINDER_BUTTON4);
        assert!(js.is_button_pressed(SIDEWINDER_BUTTON4).unwrap());
        assert!(!js.is_button_pressed(SIDEWINDER_BUTTON5).unwrap());
        assert!(!js.is_button_pressed(0).unwrap());
        assert!(!js.is_button_pressed(40).unwrap());
    }

    #[test]
    fn failed_read_is_reported() {
        let (mut js, handle, _) = stick();
        js.set_button_handler(|_ev: ButtonEvent| {});
        handle.set_failing(true);
        assert!(matches!(
            js.poll(Duration::ZERO),
            Err(RobioError::RawReadFailed { .. })
        ));
        assert!(js.axis(JoystickAxis::X).is_err());
    }

    #[test]
    fn periodic_hook_polls_buttons() {
        let (mut js, handle, _) = stick();
        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        js.set_button_handler(move |_ev: ButtonEvent| *sink.lock().unwrap() += 1);

        let dev: &mut dyn Periodic = &mut js;
        assert_eq!(dev.name(), "driver");
        dev.periodic(Duration::ZERO).unwrap();
        handle.press(PANEL_BUTTON_RED2);
        dev.periodic(Duration::from_millis(20)).unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
