//! Transport abstraction: the serial-style channel to the vehicle receiver.
//!
//! Concrete implementations live outside the core:
//! - Bluetooth RFCOMM / SPP serial link on the handheld
//! - USB CDC serial for bench testing
//! - [`LoopbackTransport`](crate::adapters::loopback::LoopbackTransport) for the demo
//!
//! Opening is asynchronous: [`SerialTransport::open`] only starts the
//! attempt, and the outcome is posted later to the owner's mailbox as
//! [`Message::Opened`](crate::events::Message::Opened) or
//! [`Message::OpenFailed`](crate::events::Message::OpenFailed), tagged with
//! the [`AttemptId`] it was started with.  Link loss is posted the same way.

use core::fmt;

use crate::error::{Reason, truncated};

/// Identifies one `connect` request so late results can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u32);

/// Handle to an open channel, issued by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u32);

/// Capacity of [`DeviceHandle::address`].
pub const ADDRESS_CAPACITY: usize = 32;

/// Capacity of [`DeviceHandle::name`]: the Bluetooth device-name limit.
pub const NAME_CAPACITY: usize = 248;

/// Opaque identifier of the target receiver, supplied by device selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Transport address (e.g. a Bluetooth MAC).
    pub address: heapless::String<ADDRESS_CAPACITY>,
    /// Display name shown to the user.
    pub name: heapless::String<NAME_CAPACITY>,
}

impl DeviceHandle {
    /// Build a handle.
    ///
    /// An address that does not fit is refused, never shortened.  The
    /// display name is cut at [`NAME_CAPACITY`] bytes on a char boundary.
    pub fn new(address: &str, name: &str) -> Result<Self, DeviceError> {
        let address = heapless::String::try_from(address)
            .map_err(|_| DeviceError::AddressTooLong(address.len()))?;
        Ok(Self {
            address,
            name: truncated(name),
        })
    }
}

/// Why a [`DeviceHandle`] could not be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// Address length in bytes, over [`ADDRESS_CAPACITY`].
    AddressTooLong(usize),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressTooLong(len) => {
                write!(f, "device address is {len} bytes (max {ADDRESS_CAPACITY})")
            }
        }
    }
}

impl core::error::Error for DeviceError {}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Classified write failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The transport rejected the payload itself (malformed or oversized).
    /// Evidence the link is unhealthy; triggers the autonomous disconnect.
    InvalidArgument,
    /// Transient I/O failure.
    Io,
    /// The channel is no longer open.  Handled as link loss.
    Closed,
}

impl WriteError {
    /// Whether this failure belongs to the invalid-argument class.
    pub fn is_argument_error(self) -> bool {
        matches!(self, Self::InvalidArgument)
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "payload rejected by transport"),
            Self::Io => write!(f, "I/O error"),
            Self::Closed => write!(f, "channel closed"),
        }
    }
}

/// Serial-style channel to the receiver.
///
/// Owned exclusively by the [`DriveService`](crate::app::service::DriveService);
/// nothing else writes to or closes it.
pub trait SerialTransport {
    /// Start opening a channel to `device`.
    ///
    /// Returns `Err` only when the attempt cannot even be started (e.g. the
    /// radio is unavailable).  Otherwise the outcome arrives later through
    /// the mailbox, tagged with `attempt`.
    fn open(&mut self, device: &DeviceHandle, attempt: AttemptId) -> Result<(), Reason>;

    /// Write one encoded line to `channel`.
    fn write(&mut self, channel: ChannelId, data: &[u8]) -> Result<(), WriteError>;

    /// Close `channel` immediately.  Closing an unknown channel is a no-op.
    fn close(&mut self, channel: ChannelId);
}

/// A transport with no radio behind it: every open fails up front.
/// Useful as a default when the handheld has no serial capability.
pub struct NullTransport;

impl SerialTransport for NullTransport {
    fn open(&mut self, _device: &DeviceHandle, _attempt: AttemptId) -> Result<(), Reason> {
        Err(crate::error::reason("serial transport unavailable"))
    }

    fn write(&mut self, _channel: ChannelId, _data: &[u8]) -> Result<(), WriteError> {
        Err(WriteError::Closed)
    }

    fn close(&mut self, _channel: ChannelId) {}
}
