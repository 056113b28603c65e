//! Scripted tilt source.
//!
//! Stands in for the handheld's accelerometer.  [`ScriptedTilt`] records
//! which subscription is live; the paired [`TiltFeed`] task posts a
//! figure-eight sweep for that subscription at the requested interval.
//! Both share one cell, so they must run on the same executor thread.

use core::cell::Cell;
use std::rc::Rc;

use embassy_time::{Duration, Instant, Timer};
use log::debug;

use crate::app::ports::TiltSource;
use crate::control::TiltSample;
use crate::events::{Mailbox, Message, post};
use crate::sensors::tilt::SubscriptionId;

/// How often the feed re-checks for a subscription while idle.
const IDLE_POLL: Duration = Duration::from_millis(10);

type Shared = Rc<Cell<Option<(SubscriptionId, Duration)>>>;

/// [`TiltSource`] half: owned by the drive service.
#[derive(Debug, Default)]
pub struct ScriptedTilt {
    live: Shared,
}

/// Producer half: an async task posting samples to the mailbox.
#[derive(Debug, Clone)]
pub struct TiltFeed {
    live: Shared,
    amplitude: f32,
}

impl ScriptedTilt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer task for this source sweeping ±`amplitude` m/s².
    pub fn feed(&self, amplitude: f32) -> TiltFeed {
        TiltFeed {
            live: self.live.clone(),
            amplitude,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.live.get().is_some()
    }
}

impl TiltSource for ScriptedTilt {
    fn subscribe(&mut self, id: SubscriptionId, interval: Duration) {
        self.live.set(Some((id, interval)));
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        if matches!(self.live.get(), Some((live, _)) if live == id) {
            self.live.set(None);
        }
    }
}

impl TiltFeed {
    /// Sample `n` of the sweep.
    pub fn sample(&self, n: u32) -> TiltSample {
        let phase = n as f32 * 0.15;
        TiltSample::new(
            self.amplitude * phase.sin(),
            self.amplitude * 0.6 * (2.0 * phase).sin(),
        )
    }

    /// Post samples for whatever subscription is live until `until`.
    pub async fn run(self, mailbox: &Mailbox, until: Instant) {
        let mut n = 0u32;
        while Instant::now() < until {
            match self.live.get() {
                Some((subscription, interval)) => {
                    post(
                        mailbox,
                        Message::Tilt {
                            subscription,
                            sample: self.sample(n),
                        },
                    );
                    n = n.wrapping_add(1);
                    Timer::after(interval).await;
                }
                None => Timer::after(IDLE_POLL).await,
            }
        }
        debug!("Tilt feed finished after {} samples", n);
    }
}
