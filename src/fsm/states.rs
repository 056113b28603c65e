//! Connection transition table.
//!
//! Pure mapping from (current state, trigger) to the next state.  The
//! [`ConnectionFsm`](super::ConnectionFsm) consults it before every
//! transition; `None` means the trigger is not valid in that state and is
//! rejected without side effects.
//!
//! | From          | Trigger             | To            |
//! |---------------|---------------------|---------------|
//! | Disconnected  | ConnectRequested    | Connecting    |
//! | Connecting    | Opened              | Connected     |
//! | Connecting    | OpenFailed          | Disconnected  |
//! | Connected     | DisconnectRequested | Disconnecting |
//! | Connected     | SendRejected        | Disconnecting |
//! | Disconnecting | GraceElapsed        | Disconnected  |
//! | Connected     | LinkLost            | Disconnected  |
//! | Disconnecting | LinkLost            | Disconnected  |
//! | *             | Teardown            | Disconnected  |

use super::LinkState;

/// Events that can move the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// User asked to connect to a device.
    ConnectRequested,
    /// Transport reported the channel open.
    Opened,
    /// Transport reported the open attempt failed.
    OpenFailed,
    /// User asked to disconnect.
    DisconnectRequested,
    /// A steady-state write failed with an invalid-argument error.
    SendRejected,
    /// The disconnect grace period elapsed.
    GraceElapsed,
    /// Transport reported the channel dropped.
    LinkLost,
    /// Session end; forced close from any state.
    Teardown,
}

impl TriggerKind {
    pub const ALL: [Self; 8] = [
        Self::ConnectRequested,
        Self::Opened,
        Self::OpenFailed,
        Self::DisconnectRequested,
        Self::SendRejected,
        Self::GraceElapsed,
        Self::LinkLost,
        Self::Teardown,
    ];
}

/// Next state for `trigger` in `from`, or `None` if the trigger is rejected.
pub const fn next_state(from: LinkState, trigger: TriggerKind) -> Option<LinkState> {
    use LinkState::{Connected, Connecting, Disconnected, Disconnecting};
    use TriggerKind as T;

    match (from, trigger) {
        (_, T::Teardown) => Some(Disconnected),
        (Disconnected, T::ConnectRequested) => Some(Connecting),
        (Connecting, T::Opened) => Some(Connected),
        (Connecting, T::OpenFailed) => Some(Disconnected),
        (Connected, T::DisconnectRequested | T::SendRejected) => Some(Disconnecting),
        (Disconnecting, T::GraceElapsed) => Some(Disconnected),
        (Connected | Disconnecting, T::LinkLost) => Some(Disconnected),
        _ => None,
    }
}
