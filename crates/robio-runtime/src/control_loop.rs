//! [`ControlLoop`] – the single thread that services every input device.
//!
//! Devices are registered once at startup and then owned by the loop.  Each
//! cycle calls [`Periodic::periodic`] on every device in registration order
//! with the same robot timestamp.  A failing device only loses its own cycle:
//! the error is logged and recorded in the [`CycleReport`], and the remaining
//! devices are still serviced.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use robio_hal::Joystick;
//! use robio_hal::sim::{SimHid, SimRunState};
//! use robio_runtime::ControlLoop;
//! use robio_types::RunMode;
//!
//! let (hid, buttons) = SimHid::new();
//! let mut stick = Joystick::new("driver", 0, Box::new(hid), Arc::new(SimRunState::new(RunMode::Teleop)));
//! stick.set_button_handler(|ev: robio_types::ButtonEvent| println!("{ev:?}"));
//!
//! let mut control = ControlLoop::new();
//! control.register(stick);
//! control.run_cycle(Duration::ZERO);
//! buttons.press(1);
//! let report = control.run_cycle(Duration::from_millis(20));
//! assert!(report.is_clean());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use robio_hal::Periodic;
use robio_types::RobioError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of one control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Robot time the cycle was run at.
    pub at: Duration,
    /// Devices serviced without error.
    pub serviced: usize,
    /// `(device name, error)` for every device whose cycle failed.
    pub failures: Vec<(String, RobioError)>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the registered devices and drives them once per cycle.
#[derive(Default)]
pub struct ControlLoop {
    devices: Vec<Box<dyn Periodic>>,
    cycles: u64,
}

impl ControlLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `device` over to the loop.  Devices run in registration order.
    pub fn register<P: Periodic + 'static>(&mut self, device: P) {
        self.register_boxed(Box::new(device));
    }

    pub fn register_boxed(&mut self, device: Box<dyn Periodic>) {
        debug!(device = device.name(), "device registered");
        self.devices.push(device);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Names of the registered devices, in service order.
    pub fn device_names(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.name()).collect()
    }

    /// Cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Service every device once at robot time `now`.
    pub fn run_cycle(&mut self, now: Duration) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport {
            cycle: self.cycles,
            at: now,
            serviced: 0,
            failures: Vec::new(),
        };

        for device in &mut self.devices {
            match device.periodic(now) {
                Ok(()) => report.serviced += 1,
                Err(e) => {
                    warn!(
                        device = device.name(),
                        cycle = self.cycles,
                        error = %e,
                        "device cycle failed"
                    );
                    report.failures.push((device.name().to_string(), e));
                }
            }
        }
        report
    }

    /// Run cycles every `period` until `shutdown` is set or `max_cycles`
    /// cycles have run (`0` runs until shutdown).
    ///
    /// Robot time starts at zero on the first cycle.  A cycle that takes
    /// longer than `period` is logged as an overrun; missed ticks are
    /// skipped rather than bunched up.
    ///
    /// Returns the number of cycles run by this call.
    ///
    /// # Errors
    ///
    /// Returns [`RobioError::Config`] for a zero `period`.
    pub async fn run(
        &mut self,
        period: Duration,
        shutdown: Arc<AtomicBool>,
        max_cycles: u64,
    ) -> Result<u64, RobioError> {
        if period.is_zero() {
            return Err(RobioError::Config("control period must be non-zero".into()));
        }

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let epoch = tokio::time::Instant::now();
        let mut ran = 0u64;

        info!(
            devices = self.devices.len(),
            period_ms = period.as_millis() as u64,
            "control loop started"
        );

        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::Acquire) {
                break;
            }

            let started = Instant::now();
            self.run_cycle(epoch.elapsed());
            ran += 1;

            let took = started.elapsed();
            if took > period {
                warn!(
                    cycle = self.cycles,
                    took_us = took.as_micros() as u64,
                    period_us = period.as_micros() as u64,
                    "control cycle overran its period"
                );
            }

            if max_cycles != 0 && ran >= max_cycles {
                break;
            }
        }

        info!(cycles = ran, "control loop stopped");
        Ok(ran)
    }
}
