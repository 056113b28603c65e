//! Unified error types for the drive link.
//!
//! A single `Error` enum that every fallible link operation converts into,
//! keeping the owner loop's error handling uniform.  Variants are `Clone`
//! and carry short fixed-capacity reasons so they can be stored as the
//! session's last error and handed to event sinks without allocation.

use core::fmt;

use crate::fsm::LinkState;
use crate::protocol::transport::WriteError;

/// Maximum length of a human-readable failure reason.
pub const REASON_CAPACITY: usize = 64;

/// Short human-readable failure reason reported by a transport.
pub type Reason = heapless::String<REASON_CAPACITY>;

/// Build a [`Reason`] from `msg`, truncating at the capacity.
pub fn reason(msg: &str) -> Reason {
    truncated(msg)
}

/// Copy as many whole characters of `s` as fit into an `N`-byte string.
pub(crate) fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Top-level link error
// ---------------------------------------------------------------------------

/// Every fallible link operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport could not open a channel to the receiver.
    TransportOpenFailed(Reason),
    /// A motor command outside the configured PWM range reached the encoder
    /// path.  Indicates a programming error upstream of the link.
    InvalidCommand,
    /// A write on the live channel failed.
    SendFailed(WriteError),
    /// The transport reported that the channel dropped.
    LinkLost,
    /// The operation is not valid in the current connection state.
    InvalidState { op: &'static str, state: LinkState },
    /// The session has been torn down and accepts no further connects.
    SessionClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportOpenFailed(reason) => write!(f, "could not connect: {reason}"),
            Self::InvalidCommand => write!(f, "motor command out of range"),
            Self::SendFailed(e) => write!(f, "send failed: {e}"),
            Self::LinkLost => write!(f, "connection to the vehicle was lost"),
            Self::InvalidState { op, state } => {
                write!(f, "cannot {op} while {}", state.name())
            }
            Self::SessionClosed => write!(f, "session already torn down"),
        }
    }
}

impl From<WriteError> for Error {
    fn from(e: WriteError) -> Self {
        Self::SendFailed(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
