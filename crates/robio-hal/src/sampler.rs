//! [`ButtonSampler`] – periodic, edge-triggered button dispatch.
//!
//! One sampler is owned by every input device.  Once per sampling period it
//! reads the raw button bitmask, diffs it against the previous sample and
//! delivers one [`ButtonEvent`] per changed bit to the registered
//! [`ButtonHandler`].
//!
//! # Dispatch rules
//!
//! * Events within one sample are delivered in ascending button order: the
//!   scan always isolates the lowest remaining changed bit first.
//! * Sampling is active only while a handler is registered.  Nothing is read
//!   while inactive and the previous mask is left untouched.
//! * **Silent resync.**  The first sample after a handler is registered on an
//!   inactive sampler only records the current mask as the new baseline.
//!   Transitions that happened while no handler was registered are never
//!   replayed.
//! * While the robot is disabled the mask is still resynchronised every
//!   period but the handler is not invoked, so buttons released during a
//!   disabled period do not produce stale release events later.
//! * Fast transitions shorter than the sampling period collapse into the net
//!   change between two samples.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use robio_hal::sampler::ButtonSampler;
//! use robio_hal::sim::{SimHid, SimRunState};
//! use robio_types::RunMode;
//!
//! let (mut hid, buttons) = SimHid::new();
//! let run_state = SimRunState::new(RunMode::Teleop);
//! let mut sampler = ButtonSampler::new("driver", 0);
//! sampler.set_button_handler(Box::new(|ev: robio_types::ButtonEvent| {
//!     println!("button {} pressed={}", ev.button, ev.pressed);
//! }));
//!
//! // First sample establishes the baseline.
//! sampler.poll(Duration::ZERO, &mut hid, &run_state).unwrap();
//! buttons.set_buttons(0b0101);
//! let dispatched = sampler.poll(Duration::from_millis(20), &mut hid, &run_state).unwrap();
//! assert_eq!(dispatched, 2);
//! ```

use std::sync::Arc;
use std::time::Duration;

use robio_types::{ButtonEvent, RobioError};
use tracing::{debug, warn};

use crate::source::{RawButtonSource, RunStateSource};
use crate::tracer::ButtonEventTracer;

/// Default sampling period (50 Hz).
pub const DEFAULT_SAMPLING_PERIOD: Duration = Duration::from_millis(20);

/// Receiver of button events.
///
/// Implemented for any `FnMut(ButtonEvent) + Send` closure.
pub trait ButtonHandler: Send {
    fn button_event(&mut self, event: ButtonEvent);
}

impl<F> ButtonHandler for F
where
    F: FnMut(ButtonEvent) + Send,
{
    fn button_event(&mut self, event: ButtonEvent) {
        self(event)
    }
}

pub use robio_types::button_bit;

/// Shared edge-detecting dispatcher for one driver-station port.
pub struct ButtonSampler {
    device_id: String,
    port: u8,
    sampling_period: Duration,
    next_sample_deadline: Duration,
    previous_mask: u32,
    resync_pending: bool,
    handler: Option<Box<dyn ButtonHandler>>,
    tracer: Option<Arc<dyn ButtonEventTracer>>,
}

impl ButtonSampler {
    /// Create an inactive sampler for `port`.
    pub fn new(device_id: impl Into<String>, port: u8) -> Self {
        Self {
            device_id: device_id.into(),
            port,
            sampling_period: DEFAULT_SAMPLING_PERIOD,
            next_sample_deadline: Duration::ZERO,
            previous_mask: 0,
            resync_pending: false,
            handler: None,
            tracer: None,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn sampling_period(&self) -> Duration {
        self.sampling_period
    }

    /// Change the sampling period.  Takes effect after the next sample.
    pub fn set_sampling_period(&mut self, period: Duration) {
        self.sampling_period = period;
    }

    pub fn next_sample_deadline(&self) -> Duration {
        self.next_sample_deadline
    }

    /// Mask recorded by the most recent sample.
    pub fn previous_mask(&self) -> u32 {
        self.previous_mask
    }

    /// Attach or detach the event tracer.
    pub fn set_event_tracer(&mut self, tracer: Option<Arc<dyn ButtonEventTracer>>) {
        self.tracer = tracer;
    }

    /// Register `handler`, replacing any previous one.
    ///
    /// Registering on an inactive sampler activates it; the next sample is a
    /// silent baseline.
    pub fn set_button_handler(&mut self, handler: Box<dyn ButtonHandler>) {
        if self.handler.is_none() {
            self.resync_pending = true;
        }
        self.handler = Some(handler);
    }

    /// Remove the handler and deactivate sampling, returning the old handler.
    pub fn clear_button_handler(&mut self) -> Option<Box<dyn ButtonHandler>> {
        self.handler.take()
    }

    /// `true` while a handler is registered.
    pub fn is_active(&self) -> bool {
        self.handler.is_some()
    }

    /// Sample the port if the sampling deadline has passed.
    ///
    /// Returns the number of handler invocations made by this call.  The run
    /// state is consulted once, and only when a sample is actually taken.
    ///
    /// # Errors
    ///
    /// Propagates the source's read error.  The sample is skipped entirely:
    /// no events, no mask update, and the deadline is left unchanged so the
    /// next call retries.
    pub fn poll<S>(
        &mut self,
        now: Duration,
        source: &mut S,
        run_state: &dyn RunStateSource,
    ) -> Result<usize, RobioError>
    where
        S: RawButtonSource + ?Sized,
    {
        if self.handler.is_none() || now < self.next_sample_deadline {
            return Ok(0);
        }

        let curr = match source.read_button_bitmask(self.port) {
            Ok(mask) => mask,
            Err(e) => {
                warn!(
                    device = %self.device_id,
                    port = self.port,
                    error = %e,
                    "button sample skipped"
                );
                return Err(e);
            }
        };

        let dispatched = if self.resync_pending {
            self.resync_pending = false;
            debug!(device = %self.device_id, mask = curr, "button baseline resynchronised");
            0
        } else if run_state.is_disabled() {
            0
        } else {
            self.dispatch(curr, now)
        };

        self.previous_mask = curr;
        self.next_sample_deadline = now + self.sampling_period;
        Ok(dispatched)
    }

    fn dispatch(&mut self, curr: u32, now: Duration) -> usize {
        let Some(handler) = self.handler.as_mut() else {
            return 0;
        };

        let mut changed = self.previous_mask ^ curr;
        let mut count = 0;
        while changed != 0 {
            // Two's-complement isolation of the lowest set bit.
            let bit = changed & changed.wrapping_neg();
            let event = ButtonEvent::new(bit.trailing_zeros() + 1, curr & bit != 0, now);

            if let Some(tracer) = &self.tracer {
                tracer.record(&event, &self.device_id);
            }
            debug!(
                device = %self.device_id,
                button = event.button,
                pressed = event.pressed,
                "button event"
            );
            handler.button_event(event);

            count += 1;
            changed &= !bit;
        }
        count
    }
}
