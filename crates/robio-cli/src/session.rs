//! Simulated robot session built from the loaded [`Config`].
//!
//! Every configured joystick and gamepad is backed by a [`SimHid`], every
//! encoder by a [`SimPositionSensor`].  A [`SimScript`] registered ahead of
//! the devices moves the simulated sticks, buttons and mechanisms each
//! cycle, so the control loop sees realistic input without hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use colored::Colorize;
use robio_hal::sim::{SimHid, SimHidHandle, SimPositionSensor, SimRunState, SimValue};
use robio_hal::{EncoderChannel, EncoderKind, Gamepad, Joystick, LogEventTracer, Periodic};
use robio_runtime::ControlLoop;
use robio_types::{ButtonEvent, RobioError};
use tracing::info;

use crate::config::{Config, EncoderConfig};

/// Encoder positions are printed every this many cycles.
const REPORT_EVERY: u64 = 25;

/// Cycles a scripted button is held (and then released) for.
const BUTTON_HOLD_CYCLES: u64 = 5;

pub struct Session {
    control: ControlLoop,
    events: Arc<AtomicU64>,
    period: Duration,
    cycles: u64,
}

impl Session {
    /// Build simulated devices for every entry in `cfg`.
    ///
    /// # Errors
    ///
    /// Propagates validation and calibration errors.
    pub fn build(cfg: &Config) -> Result<Self, RobioError> {
        cfg.validate()?;

        let run_state = Arc::new(SimRunState::new(cfg.mode));
        let events = Arc::new(AtomicU64::new(0));
        let tracer = Arc::new(LogEventTracer);
        let mut script = SimScript::default();
        let mut devices: Vec<Box<dyn Periodic>> = Vec::new();

        for js in &cfg.joysticks {
            let (hid, handle) = SimHid::new();
            let mut stick =
                Joystick::new(js.name.clone(), js.port, Box::new(hid), run_state.clone())
                    .with_deadband(js.deadband)?;
            stick.set_sampling_period(js.sampling_period());
            stick.set_y_inverted(js.y_inverted);
            if js.trace_events {
                stick.set_event_tracer(Some(tracer.clone()));
            }
            stick.set_button_handler(printer(&js.name, events.clone()));
            script.hids.push(handle);
            devices.push(Box::new(stick));
        }

        for gp in &cfg.gamepads {
            let (hid, handle) = SimHid::new();
            let mut pad = Gamepad::new(gp.name.clone(), gp.port, Box::new(hid), run_state.clone())
                .with_deadband(gp.deadband)?;
            pad.set_sampling_period(gp.sampling_period());
            pad.set_left_y_inverted(gp.left_y_inverted);
            pad.set_right_y_inverted(gp.right_y_inverted);
            if gp.trace_events {
                pad.set_event_tracer(Some(tracer.clone()));
            }
            pad.set_button_handler(printer(&gp.name, events.clone()));
            script.hids.push(handle);
            devices.push(Box::new(pad));
        }

        let mut monitor = EncoderMonitor::default();
        for enc in &cfg.encoders {
            let (channel, raw) = build_encoder(enc)?;
            script.sensors.push((enc.kind, raw));
            monitor.channels.push(channel);
        }

        let mut control = ControlLoop::new();
        control.register(script);
        for device in devices {
            control.register_boxed(device);
        }
        if !monitor.channels.is_empty() {
            control.register(monitor);
        }

        info!(
            devices = control.len(),
            mode = ?cfg.mode,
            "simulated session built"
        );

        Ok(Self {
            control,
            events,
            period: cfg.control_period(),
            cycles: cfg.cycles,
        })
    }

    /// Button events dispatched so far.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    /// Drive the control loop until Ctrl-C or the configured cycle count.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<u64, RobioError> {
        self.control.run(self.period, shutdown, self.cycles).await
    }
}

fn build_encoder(cfg: &EncoderConfig) -> Result<(EncoderChannel, SimValue), RobioError> {
    let (mut channel, raw) = match cfg.kind {
        EncoderKind::Analog => {
            let (sensor, raw) = SimPositionSensor::new(format!("{}-pot", cfg.name));
            (EncoderChannel::analog(cfg.name.clone(), sensor), raw)
        }
        EncoderKind::Absolute => {
            let (sensor, raw) = SimPositionSensor::new(format!("{}-abs", cfg.name));
            (EncoderChannel::absolute(cfg.name.clone(), sensor), raw)
        }
        EncoderKind::SensorInverted => {
            let (sensor, raw) =
                SimPositionSensor::with_direction_control(format!("{}-motor", cfg.name));
            (EncoderChannel::sensor_inverted(cfg.name.clone(), sensor), raw)
        }
    };
    channel.apply_calibration(cfg.calibration())?;
    Ok((channel, raw))
}

fn printer(device: &str, counter: Arc<AtomicU64>) -> impl FnMut(ButtonEvent) + Send + 'static {
    let device = device.to_string();
    move |ev: ButtonEvent| {
        counter.fetch_add(1, Ordering::Relaxed);
        let edge = if ev.pressed {
            "pressed ".green()
        } else {
            "released".yellow()
        };
        println!(
            "  {:>8.3}s  {:<10} button {:>2} {}",
            ev.at.as_secs_f64(),
            device.bold(),
            ev.button,
            edge
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simulated motion
// ─────────────────────────────────────────────────────────────────────────────

/// Moves every simulated source once per cycle.
#[derive(Default)]
struct SimScript {
    hids: Vec<SimHidHandle>,
    sensors: Vec<(EncoderKind, SimValue)>,
    cycle: u64,
}

impl SimScript {
    /// Buttons 1..=4 are pressed in turn, each held for
    /// [`BUTTON_HOLD_CYCLES`] and then released for as long.
    fn button_mask(cycle: u64) -> u32 {
        let phase = cycle / BUTTON_HOLD_CYCLES;
        if phase % 2 == 0 {
            1 << ((phase / 2) % 4)
        } else {
            0
        }
    }
}

impl Periodic for SimScript {
    fn name(&self) -> &str {
        "sim-script"
    }

    fn periodic(&mut self, _now: Duration) -> Result<(), RobioError> {
        let t = self.cycle as f64;
        for (i, hid) in self.hids.iter().enumerate() {
            // Offset devices so they do not all press at once.
            hid.set_buttons(Self::button_mask(self.cycle + i as u64 * 3));
            hid.set_axis(0, (t * 0.05).sin());
            hid.set_axis(1, (t * 0.05).cos());
            hid.set_axis(2, (t * 0.02).sin() * 0.5 + 0.5);
            hid.set_axis(3, (t * 0.02).cos() * 0.5 + 0.5);
            hid.set_axis(4, (t * 0.03).sin());
            hid.set_axis(5, (t * 0.03).cos());
        }
        for (kind, raw) in &self.sensors {
            match kind {
                // Potentiometer spins forward through its wrap point.
                EncoderKind::Analog => raw.set((t * 0.013).fract()),
                EncoderKind::Absolute | EncoderKind::SensorInverted => raw.set(t * 0.5),
            }
        }
        self.cycle += 1;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoder monitor
// ─────────────────────────────────────────────────────────────────────────────

/// Samples every encoder each cycle and prints positions periodically.
#[derive(Default)]
struct EncoderMonitor {
    channels: Vec<EncoderChannel>,
    cycle: u64,
}

impl Periodic for EncoderMonitor {
    fn name(&self) -> &str {
        "encoders"
    }

    fn periodic(&mut self, now: Duration) -> Result<(), RobioError> {
        let report = self.cycle % REPORT_EVERY == 0;
        self.cycle += 1;

        let mut first_err = None;
        for channel in &mut self.channels {
            if let Err(e) = channel.sample() {
                first_err.get_or_insert(e);
                continue;
            }
            if report {
                let raw = channel.get_raw_position()?;
                let position = channel.get_position()?;
                println!(
                    "  {:>8.3}s  {:<10} raw {:>9.3}  position {:>9.3}",
                    now.as_secs_f64(),
                    channel.name().cyan(),
                    raw,
                    position
                );
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
