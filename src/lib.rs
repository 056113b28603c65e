//! TiltDrive library.
//!
//! Tilt-steered remote control for a two-wheel differential-drive vehicle:
//! the handheld's tilt is mapped to per-wheel duty commands and streamed
//! over a serial-style link as `"<left>$<right>$\n"` lines.  Everything
//! here is host-testable; radios and sensors sit behind the port traits.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod fsm;
pub mod protocol;
pub mod runtime;
pub mod scheduler;
pub mod sensors;
