//! Outbound application events.
//!
//! The [`DriveService`](super::service::DriveService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide how to surface them (status line, toast or log line).

use crate::control::{MotorCommand, TiltSample};
use crate::error::Error;
use crate::fsm::{DisconnectCause, LinkState};
use crate::protocol::transport::DeviceHandle;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The connection state machine moved.
    StateChanged { from: LinkState, to: LinkState },

    /// The channel to `device` is open and the handshake was sent.
    Connected { device: DeviceHandle },

    /// A connect attempt failed; the machine is back in `Disconnected`.
    ConnectFailed(Error),

    /// The link is fully down.
    Disconnected { cause: DisconnectCause },

    /// A non-fatal failure while connected (the link stays up).
    Warning(Error),

    /// One conditioned sample and the command it produced.
    Drive(DriveTelemetry),
}

/// What the sensor read and what was commanded, for the live readout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveTelemetry {
    pub sample: TiltSample,
    pub command: MotorCommand,
}
