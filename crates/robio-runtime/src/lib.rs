//! `robio-runtime` – control-loop host and process-wide tracing setup.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: owns
//!   every registered [`Periodic`][robio_hal::Periodic] device and services
//!   them once per cycle, either cycle-by-cycle through
//!   [`run_cycle`][control_loop::ControlLoop::run_cycle] or from a `tokio`
//!   interval through [`run`][control_loop::ControlLoop::run].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.  Set
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` to export spans to any OTLP-compatible
//!   collector.

pub mod control_loop;
pub mod telemetry;

pub use control_loop::{ControlLoop, CycleReport};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
