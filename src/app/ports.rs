//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DriveService (domain)
//! ```
//!
//! Driven adapters (tilt sensor, event sinks) implement these traits.  The
//! serial link port lives next to the codec in
//! [`protocol::transport`](crate::protocol::transport).  The
//! [`DriveService`](super::service::DriveService) owns its tilt source and
//! transport; event sinks are passed at call sites.

use embassy_time::Duration;

use crate::sensors::tilt::SubscriptionId;

// ───────────────────────────────────────────────────────────────
// Tilt source port (driven adapter: sensor → domain)
// ───────────────────────────────────────────────────────────────

/// Periodic tilt sensor.
///
/// After `subscribe`, the adapter posts
/// [`Message::Tilt`](crate::events::Message::Tilt) tagged with `id` to the
/// owner's mailbox every `interval` until `unsubscribe(id)`.  Samples that
/// were already queued when the subscription ended are discarded by the
/// sampler, so adapters need not flush anything.
pub trait TiltSource {
    fn subscribe(&mut self, id: SubscriptionId, interval: Duration);

    fn unsubscribe(&mut self, id: SubscriptionId);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → UI / logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (status line, toast,
/// log).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
