//! Owner mailbox.
//!
//! Everything asynchronous that concerns the link is funnelled through one
//! bounded channel and handled one message at a time by the owner task:
//!
//! ```text
//! ┌──────────────┐
//! │ UI intents   │──▶┐
//! │ Transport cb │──▶├──▶ ┌─────────┐     ┌────────────────────┐
//! │ Tilt source  │──▶┘    │ Mailbox │────▶│ Owner (runtime.rs) │
//! └──────────────┘        └─────────┘     └────────────────────┘
//! ```
//!
//! Producers may live on other threads (`CriticalSectionRawMutex`); only the
//! owner ever touches connection state.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::UserCommand;
use crate::control::TiltSample;
use crate::error::Reason;
use crate::protocol::transport::{AttemptId, ChannelId};
use crate::sensors::tilt::SubscriptionId;

/// Maximum number of pending messages.
pub const MAILBOX_DEPTH: usize = 16;

/// Messages delivered to the owner task.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// User intent from the UI layer.
    Command(UserCommand),
    /// Transport opened the channel for `attempt`.
    Opened { attempt: AttemptId, channel: ChannelId },
    /// Transport could not open a channel for `attempt`.
    OpenFailed { attempt: AttemptId, reason: Reason },
    /// Transport lost `channel`.
    LinkLost { channel: ChannelId },
    /// Periodic raw tilt reading for `subscription`.
    Tilt {
        subscription: SubscriptionId,
        sample: TiltSample,
    },
}

/// Bounded MPSC queue into the owner.
pub type Mailbox = Channel<CriticalSectionRawMutex, Message, MAILBOX_DEPTH>;

/// Post `message` without blocking.
/// Returns `false` if the mailbox is full (message dropped).
pub fn post(mailbox: &Mailbox, message: Message) -> bool {
    match mailbox.try_send(message) {
        Ok(()) => true,
        Err(_) => {
            warn!("Mailbox full, dropping message");
            false
        }
    }
}
