//! Vehicle link protocol.
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌────────────────────┐
//! │ MotorCommand│──▶│ Codec (line) │──▶│ SerialTransport    │──▶ receiver
//! └─────────────┘   └──────────────┘   │ (trait, injected)  │
//!                                      └────────────────────┘
//! ```

pub mod codec;
pub mod transport;
