//! `robio-hal` – Input & Sensor Normalization Core
//!
//! Turns raw, frequently-sampled hardware signals into normalized values and
//! edge-triggered events.  Vendor I/O stays behind the collaborator traits in
//! [`source`]; everything in this crate is deterministic and synchronous.
//!
//! # Modules
//!
//! - [`source`] – raw-sample collaborator traits ([`RawButtonSource`],
//!   [`RawAxisSource`], [`RawPositionSource`], [`RunStateSource`]).
//! - [`sampler`] – [`ButtonSampler`][sampler::ButtonSampler]: the shared
//!   periodic, edge-triggered button dispatcher used by every HID device.
//! - [`shaper`] – deadband and squared-curve axis shaping.
//! - [`joystick`] / [`gamepad`] – [`Joystick`] and [`Gamepad`] input devices
//!   composed from the sampler and the shaper.
//! - [`encoder`] – [`EncoderChannel`][encoder::EncoderChannel]: calibrated
//!   position reading over heterogeneous backends.
//! - [`revolution`] – [`RevolutionCounter`][revolution::RevolutionCounter]:
//!   unwraps a per-turn raw reading into a continuous multi-turn value.
//! - [`tracer`] – the optional button-event tracer collaborator.
//! - [`periodic`] – the [`Periodic`] hook a control loop calls once per cycle.
//! - [`sim`] – simulated sources for tests and headless runs.

pub mod encoder;
pub mod gamepad;
pub mod joystick;
pub mod periodic;
pub mod revolution;
pub mod sampler;
pub mod shaper;
pub mod sim;
pub mod source;
pub mod tracer;

pub use encoder::{EncoderChannel, EncoderKind};
pub use gamepad::{Gamepad, GamepadAxis};
pub use joystick::{Joystick, JoystickAxis};
pub use periodic::Periodic;
pub use revolution::RevolutionCounter;
pub use sampler::{ButtonHandler, ButtonSampler, DEFAULT_SAMPLING_PERIOD};
pub use shaper::{AxisShapingPolicy, DEFAULT_DEADBAND, shape};
pub use source::{HidSource, RawAxisSource, RawButtonSource, RawPositionSource, RunStateSource};
pub use tracer::{ButtonEventTracer, LogEventTracer};
