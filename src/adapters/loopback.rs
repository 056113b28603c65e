//! In-process loopback receiver.
//!
//! Implements [`SerialTransport`] without a radio: `open` succeeds (or
//! fails, when configured unreachable) by posting the result straight
//! back to the owner's mailbox, and every written line is parsed the way
//! the vehicle receiver parses it.  Lines the receiver could not parse are
//! rejected with [`WriteError::InvalidArgument`].  Used by the demo binary
//! and for bench checks of the wire format.

use log::{debug, info};

use crate::control::MotorCommand;
use crate::error::{Reason, reason};
use crate::events::{Mailbox, Message, post};
use crate::protocol::codec::{FIELD_DELIMITER, MAX_LINE_LEN, TERMINATOR};
use crate::protocol::transport::{AttemptId, ChannelId, DeviceHandle, SerialTransport, WriteError};

/// What the emulated receiver has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverLog {
    /// Lines accepted on any channel.
    pub lines: u32,
    /// Most recent command applied to the wheels.
    pub last: Option<MotorCommand>,
}

/// Loopback transport posting its results into `mailbox`.
pub struct LoopbackTransport<'a> {
    mailbox: &'a Mailbox,
    reachable: bool,
    next_channel: u32,
    open: Option<ChannelId>,
    log: ReceiverLog,
}

impl<'a> LoopbackTransport<'a> {
    pub fn new(mailbox: &'a Mailbox) -> Self {
        Self {
            mailbox,
            reachable: true,
            next_channel: 0,
            open: None,
            log: ReceiverLog::default(),
        }
    }

    /// A receiver that never answers: every open fails.
    pub fn unreachable(mailbox: &'a Mailbox) -> Self {
        Self {
            reachable: false,
            ..Self::new(mailbox)
        }
    }

    /// Simulate the radio dropping the open channel.
    ///
    /// Returns `false` when there was nothing to drop or the owner could
    /// not be told; the channel then stays open.
    pub fn drop_link(&mut self) -> bool {
        let Some(channel) = self.open else {
            return false;
        };
        if !post(self.mailbox, Message::LinkLost { channel }) {
            return false;
        }
        info!("Loopback: dropped channel {}", channel.0);
        self.open = None;
        true
    }

    pub fn open_channel(&self) -> Option<ChannelId> {
        self.open
    }

    pub fn receiver_log(&self) -> ReceiverLog {
        self.log
    }
}

impl SerialTransport for LoopbackTransport<'_> {
    fn open(&mut self, device: &DeviceHandle, attempt: AttemptId) -> Result<(), Reason> {
        if !self.reachable {
            let failed = Message::OpenFailed {
                attempt,
                reason: reason("receiver not responding"),
            };
            return if post(self.mailbox, failed) {
                Ok(())
            } else {
                Err(reason("mailbox full"))
            };
        }

        let channel = ChannelId(self.next_channel.wrapping_add(1));
        if !post(self.mailbox, Message::Opened { attempt, channel }) {
            return Err(reason("mailbox full"));
        }
        self.next_channel = channel.0;
        self.open = Some(channel);
        debug!("Loopback: {device} answered on channel {}", channel.0);
        Ok(())
    }

    fn write(&mut self, channel: ChannelId, data: &[u8]) -> Result<(), WriteError> {
        if self.open != Some(channel) {
            return Err(WriteError::Closed);
        }
        let command = parse_line(data).ok_or(WriteError::InvalidArgument)?;
        self.log.lines = self.log.lines.saturating_add(1);
        self.log.last = Some(command);
        Ok(())
    }

    fn close(&mut self, channel: ChannelId) {
        if self.open == Some(channel) {
            self.open = None;
            debug!("Loopback: channel {} closed", channel.0);
        }
    }
}

/// Parse one `"<left>$<right>$\n"` line as the receiver does.
fn parse_line(data: &[u8]) -> Option<MotorCommand> {
    if data.len() > MAX_LINE_LEN {
        return None;
    }
    let text = core::str::from_utf8(data).ok()?;
    let body = text.strip_suffix(TERMINATOR)?;
    let mut fields = body.split(FIELD_DELIMITER);
    let left = fields.next()?.parse().ok()?;
    let right = fields.next()?.parse().ok()?;
    match (fields.next(), fields.next()) {
        (Some(""), None) => Some(MotorCommand::new(left, right)),
        _ => None,
    }
}
