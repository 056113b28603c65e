//! Mock adapters for integration tests.
//!
//! Records every transport and tilt-source call so tests can assert on the
//! full history without a radio or a sensor.

use std::collections::VecDeque;

use embassy_time::Duration;
use tiltdrive::app::events::AppEvent;
use tiltdrive::app::ports::{EventSink, TiltSource};
use tiltdrive::error::{Reason, reason};
use tiltdrive::protocol::transport::{AttemptId, ChannelId, DeviceHandle, SerialTransport, WriteError};
use tiltdrive::sensors::tilt::SubscriptionId;

// ── Transport call record ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum LinkCall {
    Open { address: String, attempt: AttemptId },
    Write { channel: ChannelId, line: String },
    Close(ChannelId),
}

// ── MockLink ──────────────────────────────────────────────────

/// Transport whose opens complete only when the test says so.
#[derive(Default)]
pub struct MockLink {
    pub calls: Vec<LinkCall>,
    /// Fail the next `open` synchronously with this reason.
    pub refuse_open: Option<&'static str>,
    /// Scripted outcomes for the next writes, in order (then `Ok`).
    pub write_results: VecDeque<Result<(), WriteError>>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcomes of the next writes.
    pub fn with_writes(results: impl IntoIterator<Item = Result<(), WriteError>>) -> Self {
        Self {
            write_results: results.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Every successfully written line, in order.
    pub fn lines(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LinkCall::Write { line, .. } => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<ChannelId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LinkCall::Close(ch) => Some(*ch),
                _ => None,
            })
            .collect()
    }

    pub fn opens(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, LinkCall::Open { .. }))
            .count()
    }

    pub fn last_attempt(&self) -> Option<AttemptId> {
        self.calls.iter().rev().find_map(|c| match c {
            LinkCall::Open { attempt, .. } => Some(*attempt),
            _ => None,
        })
    }
}

impl SerialTransport for MockLink {
    fn open(&mut self, device: &DeviceHandle, attempt: AttemptId) -> Result<(), Reason> {
        self.calls.push(LinkCall::Open {
            address: device.address.as_str().to_owned(),
            attempt,
        });
        match self.refuse_open.take() {
            Some(why) => Err(reason(why)),
            None => Ok(()),
        }
    }

    fn write(&mut self, channel: ChannelId, data: &[u8]) -> Result<(), WriteError> {
        if let Some(Err(e)) = self.write_results.pop_front() {
            return Err(e);
        }
        self.calls.push(LinkCall::Write {
            channel,
            line: String::from_utf8_lossy(data).into_owned(),
        });
        Ok(())
    }

    fn close(&mut self, channel: ChannelId) {
        self.calls.push(LinkCall::Close(channel));
    }
}

// ── MockTilt ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTilt {
    pub active: Option<(SubscriptionId, Duration)>,
    pub subscribes: u32,
    pub unsubscribes: u32,
}

#[allow(dead_code)]
impl MockTilt {
    pub fn live(&self) -> Option<SubscriptionId> {
        self.active.map(|(id, _)| id)
    }
}

impl TiltSource for MockTilt {
    fn subscribe(&mut self, id: SubscriptionId, interval: Duration) {
        self.subscribes += 1;
        self.active = Some((id, interval));
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.unsubscribes += 1;
        if self.live() == Some(id) {
            self.active = None;
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn last(&self) -> Option<&AppEvent> {
        self.events.last()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
