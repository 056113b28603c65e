//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of a drive session: connection
//! lifecycle, sampling, mapping and sending.  All interaction with the
//! radio and the sensor happens through **port traits** defined in
//! [`ports`] (and [`SerialTransport`](crate::protocol::transport::SerialTransport)),
//! keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
