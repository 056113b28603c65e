//! Link diagnostics.
//!
//! Plain counters kept by the owner while the session runs.  They are not
//! part of any decision; the demo binary prints them as JSON on exit and
//! tests use them to observe drops that are otherwise silent.

use serde::{Deserialize, Serialize};

/// Session-wide link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Lines written successfully (drive, neutral and handshake).
    pub lines_sent: u32,
    /// Drive commands discarded because no channel was live.
    pub commands_dropped: u32,
    /// Writes the transport refused.
    pub send_failures: u32,
    /// Tilt samples from a revoked subscription.
    pub stale_samples: u32,
    /// Async results for an attempt or channel that is no longer current.
    pub stale_results: u32,
    /// Channels opened.
    pub connects: u32,
    /// Channels released (graceful, lost or torn down).
    pub disconnects: u32,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self) {
        self.lines_sent = self.lines_sent.saturating_add(1);
    }

    pub fn record_dropped(&mut self) {
        self.commands_dropped = self.commands_dropped.saturating_add(1);
    }

    pub fn record_send_failure(&mut self) {
        self.send_failures = self.send_failures.saturating_add(1);
    }

    pub fn record_stale_sample(&mut self) {
        self.stale_samples = self.stale_samples.saturating_add(1);
    }

    pub fn record_stale_result(&mut self) {
        self.stale_results = self.stale_results.saturating_add(1);
    }

    pub fn record_connect(&mut self) {
        self.connects = self.connects.saturating_add(1);
    }

    pub fn record_disconnect(&mut self) {
        self.disconnects = self.disconnects.saturating_add(1);
    }
}
