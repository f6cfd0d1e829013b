//! Button-event tracer collaborator.
//!
//! A tracer is handed to each input device explicitly (no process-wide
//! singleton).  It observes every dispatched [`ButtonEvent`] together with the
//! identity of the device that produced it.  Recording happens before the
//! handler runs and never changes dispatch order or timing.

use robio_types::ButtonEvent;
use tracing::info;

/// Observer for dispatched button events.
pub trait ButtonEventTracer: Send + Sync {
    fn record(&self, event: &ButtonEvent, device_id: &str);
}

/// Tracer that emits one structured `tracing` record per event under the
/// `robio::buttons` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventTracer;

impl ButtonEventTracer for LogEventTracer {
    fn record(&self, event: &ButtonEvent, device_id: &str) {
        info!(
            target: "robio::buttons",
            device = device_id,
            button = event.button,
            pressed = event.pressed,
            at_ms = event.at.as_secs_f64() * 1000.0,
            "button event"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn log_tracer_records_without_subscriber() {
        // No subscriber installed: recording must be a silent no-op.
        LogEventTracer.record(&ButtonEvent::new(2, true, Duration::from_millis(40)), "pad");
    }
}
