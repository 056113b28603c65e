//! Connection lifecycle state machine.
//!
//! ```text
//!                 connect                 opened
//!  ┌──────────────┐ ──────▶ ┌────────────┐ ──────▶ ┌───────────┐
//!  │ Disconnected │         │ Connecting │         │ Connected │
//!  └──────────────┘ ◀────── └────────────┘         └───────────┘
//!     ▲    ▲        open failed                     │    │
//!     │    │                  disconnect / rejected │    │ link lost
//!     │    │  grace elapsed  ┌───────────────┐ ◀────┘    │
//!     │    └──────────────── │ Disconnecting │           │
//!     │                      └───────────────┘           │
//!     └──────────────────────────────────────────────────┘
//!            teardown: any state → Disconnected
//! ```
//!
//! Each state carries exactly the data that is valid in it (attempt id,
//! device, channel, pending disconnect), so a `Connected` state without an
//! open channel cannot be represented.  Only the owning
//! [`DriveService`](crate::app::service::DriveService) can apply triggers:
//! [`ConnectionFsm::apply`] is crate-private and consults the pure table in
//! [`states::next_state`] before touching anything.

pub mod states;

use log::info;

use crate::protocol::transport::{AttemptId, ChannelId, DeviceHandle};
use crate::scheduler::PendingDisconnect;
use states::{TriggerKind, next_state};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Read-only tag of the current connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LinkState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Disconnecting = 3,
}

impl LinkState {
    pub const ALL: [Self; 4] = [
        Self::Disconnected,
        Self::Connecting,
        Self::Connected,
        Self::Disconnecting,
    ];

    /// Lower-case name for logs and user messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
        }
    }
}

/// Why a connection is being (or was) taken down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectCause {
    /// The user asked to disconnect.
    UserRequested,
    /// A write was rejected as malformed; the link is presumed unhealthy.
    SendRejected,
    /// The transport reported the channel gone.
    LinkLost,
    /// The session ended.
    Teardown,
}

// ---------------------------------------------------------------------------
// State data
// ---------------------------------------------------------------------------

/// Connection state with its per-state data.
#[derive(Debug)]
pub(crate) enum Connection {
    Disconnected,
    Connecting {
        attempt: AttemptId,
        device: DeviceHandle,
    },
    Connected {
        device: DeviceHandle,
        channel: ChannelId,
    },
    Disconnecting {
        device: DeviceHandle,
        channel: ChannelId,
        cause: DisconnectCause,
        pending: PendingDisconnect,
    },
}

impl Connection {
    fn tag(&self) -> LinkState {
        match self {
            Self::Disconnected => LinkState::Disconnected,
            Self::Connecting { .. } => LinkState::Connecting,
            Self::Connected { .. } => LinkState::Connected,
            Self::Disconnecting { .. } => LinkState::Disconnecting,
        }
    }
}

/// A trigger together with the data the target state needs.
#[derive(Debug)]
pub(crate) enum Trigger {
    ConnectRequested {
        attempt: AttemptId,
        device: DeviceHandle,
    },
    Opened {
        attempt: AttemptId,
        channel: ChannelId,
    },
    OpenFailed {
        attempt: AttemptId,
    },
    DisconnectRequested {
        pending: PendingDisconnect,
    },
    SendRejected {
        pending: PendingDisconnect,
    },
    GraceElapsed,
    LinkLost {
        channel: ChannelId,
    },
    Teardown,
}

impl Trigger {
    fn kind(&self) -> TriggerKind {
        match self {
            Self::ConnectRequested { .. } => TriggerKind::ConnectRequested,
            Self::Opened { .. } => TriggerKind::Opened,
            Self::OpenFailed { .. } => TriggerKind::OpenFailed,
            Self::DisconnectRequested { .. } => TriggerKind::DisconnectRequested,
            Self::SendRejected { .. } => TriggerKind::SendRejected,
            Self::GraceElapsed => TriggerKind::GraceElapsed,
            Self::LinkLost { .. } => TriggerKind::LinkLost,
            Self::Teardown => TriggerKind::Teardown,
        }
    }
}

/// A trigger that did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rejected {
    pub state: LinkState,
    pub trigger: TriggerKind,
}

// ---------------------------------------------------------------------------
// FSM
// ---------------------------------------------------------------------------

/// Owner of the single [`Connection`] of a session.
#[derive(Debug)]
pub struct ConnectionFsm {
    current: Connection,
}

impl Default for ConnectionFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFsm {
    /// Start in `Disconnected`.
    pub fn new() -> Self {
        Self {
            current: Connection::Disconnected,
        }
    }

    /// The current state's identity.
    pub fn state(&self) -> LinkState {
        self.current.tag()
    }

    /// Channel that is open right now, if any.
    pub fn channel(&self) -> Option<ChannelId> {
        match &self.current {
            Connection::Connected { channel, .. } | Connection::Disconnecting { channel, .. } => {
                Some(*channel)
            }
            _ => None,
        }
    }

    /// Channel that may carry drive commands (only while `Connected`).
    pub fn live_channel(&self) -> Option<ChannelId> {
        match &self.current {
            Connection::Connected { channel, .. } => Some(*channel),
            _ => None,
        }
    }

    /// Device being connected to or connected, if any.
    pub fn device(&self) -> Option<&DeviceHandle> {
        match &self.current {
            Connection::Disconnected => None,
            Connection::Connecting { device, .. }
            | Connection::Connected { device, .. }
            | Connection::Disconnecting { device, .. } => Some(device),
        }
    }

    /// In-flight connect attempt, if any.
    pub fn attempt(&self) -> Option<AttemptId> {
        match &self.current {
            Connection::Connecting { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    /// Pending graceful close, if disconnecting.
    pub(crate) fn pending_mut(&mut self) -> Option<&mut PendingDisconnect> {
        match &mut self.current {
            Connection::Disconnecting { pending, .. } => Some(pending),
            _ => None,
        }
    }

    /// Deadline of the pending graceful close, if any.
    pub fn pending_deadline(&self) -> Option<embassy_time::Instant> {
        match &self.current {
            Connection::Disconnecting { pending, .. } => pending.deadline(),
            _ => None,
        }
    }

    /// Apply `trigger`.
    ///
    /// On success returns the state that was left, so the caller can
    /// release what it held (close its channel, cancel its timer).  Stale
    /// callbacks whose attempt or channel id does not match the current
    /// state are rejected like any other invalid trigger.
    pub(crate) fn apply(&mut self, trigger: Trigger) -> Result<Connection, Rejected> {
        let from = self.state();
        let kind = trigger.kind();
        let rejected = Rejected {
            state: from,
            trigger: kind,
        };
        let Some(to) = next_state(from, kind) else {
            return Err(rejected);
        };

        let next = match (&self.current, trigger) {
            (_, Trigger::Teardown) => Connection::Disconnected,
            (Connection::Disconnected, Trigger::ConnectRequested { attempt, device }) => {
                Connection::Connecting { attempt, device }
            }
            (Connection::Connecting { attempt, device }, Trigger::Opened { attempt: got, channel })
                if *attempt == got =>
            {
                Connection::Connected {
                    device: device.clone(),
                    channel,
                }
            }
            (Connection::Connecting { attempt, .. }, Trigger::OpenFailed { attempt: got })
                if *attempt == got =>
            {
                Connection::Disconnected
            }
            (Connection::Connected { device, channel }, Trigger::DisconnectRequested { pending }) => {
                Connection::Disconnecting {
                    device: device.clone(),
                    channel: *channel,
                    cause: DisconnectCause::UserRequested,
                    pending,
                }
            }
            (Connection::Connected { device, channel }, Trigger::SendRejected { pending }) => {
                Connection::Disconnecting {
                    device: device.clone(),
                    channel: *channel,
                    cause: DisconnectCause::SendRejected,
                    pending,
                }
            }
            (Connection::Disconnecting { .. }, Trigger::GraceElapsed) => Connection::Disconnected,
            (
                Connection::Connected { channel, .. } | Connection::Disconnecting { channel, .. },
                Trigger::LinkLost { channel: got },
            ) if *channel == got => Connection::Disconnected,
            _ => return Err(rejected),
        };

        debug_assert_eq!(next.tag(), to);
        info!("Link transition: {} -> {}", from.name(), to.name());
        Ok(core::mem::replace(&mut self.current, next))
    }
}
