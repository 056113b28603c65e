//! Tilt sampler.
//!
//! Holds the one live subscription to the [`TiltSource`] and filters what
//! comes back: only samples tagged with the current [`SubscriptionId`] are
//! conditioned (clamped + dead-zoned by the mixer's helper) and passed on.
//! Revoking the subscription therefore also discards any samples still
//! sitting in the mailbox.

use embassy_time::Duration;
use log::debug;

use crate::app::ports::TiltSource;
use crate::config::MixerConfig;
use crate::control::{TiltSample, mixer};

/// Tags the samples of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u32);

/// Subscription handle plus the interval it was requested with.
#[derive(Debug)]
pub struct TiltSampler {
    interval: Duration,
    current: Option<SubscriptionId>,
    next_id: u32,
}

impl TiltSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            current: None,
            next_id: 0,
        }
    }

    /// Subscribe to `source`, replacing any previous subscription.
    pub fn start(&mut self, source: &mut impl TiltSource) -> SubscriptionId {
        self.stop(source);
        self.next_id = self.next_id.wrapping_add(1);
        let id = SubscriptionId(self.next_id);
        source.subscribe(id, self.interval);
        self.current = Some(id);
        debug!(
            "Tilt: subscribed #{} every {} ms",
            id.0,
            self.interval.as_millis()
        );
        id
    }

    /// Release the subscription.  No-op when not active.
    pub fn stop(&mut self, source: &mut impl TiltSource) {
        if let Some(id) = self.current.take() {
            source.unsubscribe(id);
            debug!("Tilt: unsubscribed #{}", id.0);
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.current
    }

    /// Condition a sample if it belongs to the live subscription.
    pub fn accept(
        &self,
        id: SubscriptionId,
        raw: TiltSample,
        config: &MixerConfig,
    ) -> Option<TiltSample> {
        (self.current == Some(id)).then(|| mixer::condition(raw, config))
    }
}
