//! Inbound user intents.
//!
//! These represent actions requested from the handheld UI that the
//! [`DriveService`](super::service::DriveService) interprets and acts upon.

use crate::protocol::transport::DeviceHandle;

/// Commands the UI can post into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Connect to the selected receiver.
    Connect(DeviceHandle),

    /// Stop the vehicle and close the link after the grace period.
    Disconnect,

    /// App went to the background: stop sampling, keep the link.
    SuspendSampling,

    /// App came back to the foreground: resume sampling if connected.
    ResumeSampling,

    /// Session end: close immediately and release everything.
    Teardown,
}
