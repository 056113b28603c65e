//! Sensor subsystem.
//!
//! The handheld has a single control input, the tilt sensor, consumed
//! through the [`TiltSource`](crate::app::ports::TiltSource) port and gated
//! by the [`TiltSampler`](tilt::TiltSampler).

pub mod tilt;
