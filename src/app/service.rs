//! Application service: the connection owner.
//!
//! [`DriveService`] owns the connection state machine, the transport, the
//! tilt subscription and the grace timer.  Everything that changes link
//! state goes through it, one call at a time; asynchronous results come
//! back as [`Message`]s and are fed to [`DriveService::handle`] by the
//! runtime loop.  Time is passed in explicitly so the whole service runs
//! under test without a clock.
//!
//! ```text
//!  TiltSource ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │         DriveService          │
//!  Mailbox ─────▶ │  FSM · Sampler · Mixer · Codec│ ──▶ SerialTransport
//!                 └──────────────────────────────┘
//! ```

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::config::DriveConfig;
use crate::control::{MotorCommand, TiltSample, mixer};
use crate::diagnostics::LinkStats;
use crate::error::{Error, Reason, Result};
use crate::events::Message;
use crate::fsm::{Connection, ConnectionFsm, DisconnectCause, LinkState, Rejected, Trigger};
use crate::protocol::codec;
use crate::protocol::transport::{AttemptId, ChannelId, DeviceHandle, SerialTransport, WriteError};
use crate::scheduler::PendingDisconnect;
use crate::sensors::tilt::{SubscriptionId, TiltSampler};

use super::commands::UserCommand;
use super::events::{AppEvent, DriveTelemetry};
use super::ports::{EventSink, TiltSource};

/// Whether the owner loop should keep running after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// What a failed write is allowed to do to the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePolicy {
    /// Argument errors start the autonomous disconnect; others are reported.
    Disconnect,
    /// Best effort; the failure is only logged.
    Ignore,
}

// ───────────────────────────────────────────────────────────────
// DriveService
// ───────────────────────────────────────────────────────────────

/// Owner of one drive session.
pub struct DriveService<T, S> {
    config: DriveConfig,
    transport: T,
    tilt: S,
    fsm: ConnectionFsm,
    sampler: TiltSampler,
    next_attempt: u32,
    /// App is in the background: keep the link, don't sample.
    sampling_suspended: bool,
    /// Torn down; no further connects.
    closed: bool,
    last_error: Option<Error>,
    stats: LinkStats,
}

impl<T: SerialTransport, S: TiltSource> DriveService<T, S> {
    /// Build a session around an injected transport and tilt source.
    pub fn new(config: DriveConfig, transport: T, tilt: S) -> Self {
        let interval = Duration::from_millis(u64::from(config.sample_interval_ms));
        Self {
            sampler: TiltSampler::new(interval),
            config,
            transport,
            tilt,
            fsm: ConnectionFsm::new(),
            next_attempt: 0,
            sampling_suspended: false,
            closed: false,
            last_error: None,
            stats: LinkStats::new(),
        }
    }

    // ── User operations ───────────────────────────────────────

    /// Start connecting to `device`.
    ///
    /// Only valid while `Disconnected`; otherwise nothing happens and the
    /// rejection is returned.  The outcome arrives later as
    /// [`Message::Opened`] or [`Message::OpenFailed`].  If the transport
    /// refuses to even start, the failure is handled exactly like an
    /// asynchronous one.
    pub fn connect(&mut self, device: DeviceHandle, sink: &mut impl EventSink) -> Result<AttemptId> {
        if self.closed {
            warn!("Connect to {device} refused: session torn down");
            return Err(Error::SessionClosed);
        }
        let state = self.fsm.state();
        if state != LinkState::Disconnected {
            warn!("Connect to {device} refused while {}", state.name());
            return Err(Error::InvalidState { op: "connect", state });
        }

        self.next_attempt = self.next_attempt.wrapping_add(1);
        let attempt = AttemptId(self.next_attempt);
        self.transition(
            Trigger::ConnectRequested {
                attempt,
                device: device.clone(),
            },
            sink,
        )
        .map_err(|r| Error::InvalidState {
            op: "connect",
            state: r.state,
        })?;

        info!("Connecting to {device} (attempt #{})", attempt.0);
        if let Err(reason) = self.transport.open(&device, attempt) {
            self.on_open_failed(attempt, reason, sink);
        }
        Ok(attempt)
    }

    /// Stop the vehicle and close the link after the grace period.
    ///
    /// Idempotent while already disconnecting; rejected with no effect in
    /// any other state.
    pub fn disconnect(&mut self, now: Instant, sink: &mut impl EventSink) -> Result<()> {
        match self.fsm.state() {
            LinkState::Connected => {
                info!("Disconnect requested");
                self.begin_disconnect(DisconnectCause::UserRequested, now, sink);
                Ok(())
            }
            LinkState::Disconnecting => {
                debug!("Disconnect already in progress");
                Ok(())
            }
            state => {
                warn!("Disconnect ignored while {}", state.name());
                Err(Error::InvalidState {
                    op: "disconnect",
                    state,
                })
            }
        }
    }

    /// Write one drive command to the live channel.
    ///
    /// Commands outside `[-max_pwm, max_pwm]` are refused.  Without a live
    /// channel the command is dropped and counted.
    pub fn send(&mut self, command: MotorCommand, now: Instant, sink: &mut impl EventSink) -> Result<()> {
        if !command.is_within(self.config.mixer.max_pwm) {
            warn!(
                "Refusing out-of-range command {}/{}",
                command.left, command.right
            );
            return Err(Error::InvalidCommand);
        }
        if self.fsm.live_channel().is_none() {
            self.stats.record_dropped();
            debug!("Dropped command while {}", self.fsm.state().name());
            return Ok(());
        }
        self.write_line(command.left, command.right, FailurePolicy::Disconnect, now, sink)
    }

    /// Map an injected tilt sample and send it.
    ///
    /// Ignored (counted as dropped) unless connected with sampling enabled.
    pub fn on_tilt_sample(&mut self, sample: TiltSample, now: Instant, sink: &mut impl EventSink) {
        if self.fsm.state() != LinkState::Connected || self.sampling_suspended {
            self.stats.record_dropped();
            return;
        }
        let sample = mixer::condition(sample, &self.config.mixer);
        self.drive(sample, now, sink);
    }

    /// Stop sampling (app in the background).  The link stays up.
    pub fn suspend_sampling(&mut self) {
        if !self.sampling_suspended {
            info!("Tilt sampling suspended");
        }
        self.sampling_suspended = true;
        self.sampler.stop(&mut self.tilt);
    }

    /// Resume sampling (app back in the foreground).
    pub fn resume_sampling(&mut self) {
        if self.sampling_suspended {
            info!("Tilt sampling resumed");
        }
        self.sampling_suspended = false;
        if self.fsm.state() == LinkState::Connected && !self.sampler.is_active() {
            self.sampler.start(&mut self.tilt);
        }
    }

    /// Close everything immediately and end the session.
    ///
    /// Cancels the grace timer, revokes the tilt subscription and closes
    /// any open channel without the neutral command.  An in-flight connect
    /// is abandoned; if it completes later its channel is closed on
    /// arrival.  Further `connect` calls fail with
    /// [`Error::SessionClosed`].
    pub fn teardown(&mut self, sink: &mut impl EventSink) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.sampler.stop(&mut self.tilt);

        match self.transition(Trigger::Teardown, sink) {
            Ok(Connection::Connected { channel, .. }) => {
                self.release(channel, DisconnectCause::Teardown, sink);
            }
            Ok(Connection::Disconnecting {
                channel,
                mut pending,
                ..
            }) => {
                pending.cancel();
                self.release(channel, DisconnectCause::Teardown, sink);
            }
            Ok(Connection::Connecting { attempt, .. }) => {
                info!("Abandoned connect attempt #{}", attempt.0);
            }
            Ok(Connection::Disconnected) | Err(_) => {}
        }
        info!("Session torn down");
    }

    // ── Asynchronous results ──────────────────────────────────

    /// The transport opened `channel` for `attempt`.
    pub fn on_opened(
        &mut self,
        attempt: AttemptId,
        channel: ChannelId,
        now: Instant,
        sink: &mut impl EventSink,
    ) {
        if self.transition(Trigger::Opened { attempt, channel }, sink).is_err() {
            self.stats.record_stale_result();
            if self.fsm.channel() == Some(channel) {
                debug!("Duplicate open result for channel {}", channel.0);
            } else {
                warn!(
                    "Open result for stale attempt #{}, closing channel {}",
                    attempt.0, channel.0
                );
                self.transport.close(channel);
            }
            return;
        }

        self.stats.record_connect();
        self.last_error = None;
        if let Some(device) = self.fsm.device().cloned() {
            info!("Connected to {device} on channel {}", channel.0);
            sink.emit(&AppEvent::Connected { device });
        }
        if !self.sampling_suspended {
            self.sampler.start(&mut self.tilt);
        }
        let (left, right) = self.config.handshake;
        // Failures are handled inside (rejects disconnect, closed means lost).
        let _ = self.write_line(left, right, FailurePolicy::Disconnect, now, sink);
    }

    /// The transport could not open a channel for `attempt`.
    pub fn on_open_failed(&mut self, attempt: AttemptId, reason: Reason, sink: &mut impl EventSink) {
        if self.transition(Trigger::OpenFailed { attempt }, sink).is_err() {
            debug!("Ignoring open failure for stale attempt #{}", attempt.0);
            self.stats.record_stale_result();
            return;
        }
        let err = Error::TransportOpenFailed(reason);
        warn!("{err}");
        self.last_error = Some(err.clone());
        sink.emit(&AppEvent::ConnectFailed(err));
    }

    /// The transport lost `channel`.  No grace period and no close call.
    pub fn on_link_lost(&mut self, channel: ChannelId, sink: &mut impl EventSink) {
        let left = match self.transition(Trigger::LinkLost { channel }, sink) {
            Ok(left) => left,
            Err(_) => {
                debug!("Ignoring loss of stale channel {}", channel.0);
                self.stats.record_stale_result();
                return;
            }
        };

        self.sampler.stop(&mut self.tilt);
        self.stats.record_disconnect();
        let cause = match left {
            Connection::Disconnecting {
                mut pending, cause, ..
            } => {
                pending.cancel();
                info!("Channel {} dropped during disconnect", channel.0);
                cause
            }
            _ => {
                warn!("Link lost on channel {}", channel.0);
                self.last_error = Some(Error::LinkLost);
                DisconnectCause::LinkLost
            }
        };
        sink.emit(&AppEvent::Disconnected { cause });
    }

    /// A periodic sample tagged with `subscription`.
    ///
    /// Samples from a revoked subscription are discarded.
    pub fn on_subscribed_sample(
        &mut self,
        subscription: SubscriptionId,
        raw: TiltSample,
        now: Instant,
        sink: &mut impl EventSink,
    ) {
        match self.sampler.accept(subscription, raw, &self.config.mixer) {
            Some(sample) => self.drive(sample, now, sink),
            None => self.stats.record_stale_sample(),
        }
    }

    // ── Timer ─────────────────────────────────────────────────

    /// Run whatever is due at `now`: closes the channel once the grace
    /// period of a pending disconnect has elapsed.
    pub fn poll(&mut self, now: Instant, sink: &mut impl EventSink) {
        let due = self.fsm.pending_mut().is_some_and(|p| p.fire(now));
        if !due {
            return;
        }
        if let Ok(Connection::Disconnecting { channel, cause, .. }) =
            self.transition(Trigger::GraceElapsed, sink)
        {
            self.release(channel, cause, sink);
        }
    }

    /// When [`poll`](Self::poll) next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.fsm.pending_deadline()
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Process one mailbox message.
    pub fn handle(&mut self, message: Message, now: Instant, sink: &mut impl EventSink) -> Flow {
        match message {
            Message::Command(command) => return self.handle_command(command, now, sink),
            Message::Opened { attempt, channel } => self.on_opened(attempt, channel, now, sink),
            Message::OpenFailed { attempt, reason } => self.on_open_failed(attempt, reason, sink),
            Message::LinkLost { channel } => self.on_link_lost(channel, sink),
            Message::Tilt {
                subscription,
                sample,
            } => self.on_subscribed_sample(subscription, sample, now, sink),
        }
        Flow::Continue
    }

    fn handle_command(&mut self, command: UserCommand, now: Instant, sink: &mut impl EventSink) -> Flow {
        let result = match command {
            UserCommand::Connect(device) => self.connect(device, sink).map(|_| ()),
            UserCommand::Disconnect => self.disconnect(now, sink),
            UserCommand::SuspendSampling => {
                self.suspend_sampling();
                Ok(())
            }
            UserCommand::ResumeSampling => {
                self.resume_sampling();
                Ok(())
            }
            UserCommand::Teardown => {
                self.teardown(sink);
                return Flow::Exit;
            }
        };
        if let Err(e) = result {
            sink.emit(&AppEvent::Warning(e));
        }
        Flow::Continue
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.fsm.state()
    }

    /// Device currently targeted, if any.
    pub fn device(&self) -> Option<&DeviceHandle> {
        self.fsm.device()
    }

    /// Channel currently open, if any.
    pub fn channel(&self) -> Option<ChannelId> {
        self.fsm.channel()
    }

    /// Most recent terminal failure, cleared by the next successful connect.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_active()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn tilt_source(&self) -> &S {
        &self.tilt
    }

    // ── Internal helpers ──────────────────────────────────────

    /// Apply `trigger` and report the state change.
    fn transition(&mut self, trigger: Trigger, sink: &mut impl EventSink) -> core::result::Result<Connection, Rejected> {
        let from = self.fsm.state();
        let left = self.fsm.apply(trigger).inspect_err(|r| {
            debug!("Trigger {:?} not valid while {}", r.trigger, r.state.name());
        })?;
        let to = self.fsm.state();
        if from != to {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
        Ok(left)
    }

    fn drive(&mut self, sample: TiltSample, now: Instant, sink: &mut impl EventSink) {
        let command = mixer::map_tilt(sample, &self.config.mixer);
        sink.emit(&AppEvent::Drive(DriveTelemetry { sample, command }));
        // Failures are handled inside (rejects disconnect, closed means lost).
        let _ = self.send(command, now, sink);
    }

    fn write_line(
        &mut self,
        left: i16,
        right: i16,
        policy: FailurePolicy,
        now: Instant,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let Some(channel) = self.fsm.channel() else {
            self.stats.record_dropped();
            return Ok(());
        };
        let line = codec::encode(left, right);
        match self.transport.write(channel, line.as_bytes()) {
            Ok(()) => {
                self.stats.record_sent();
                debug!("Sent {:?} on channel {}", line.as_str(), channel.0);
                Ok(())
            }
            Err(e) => {
                self.stats.record_send_failure();
                let err = Error::SendFailed(e);
                match policy {
                    FailurePolicy::Disconnect if e.is_argument_error() => {
                        warn!("{err}, disconnecting");
                        self.last_error = Some(err.clone());
                        self.begin_disconnect(DisconnectCause::SendRejected, now, sink);
                    }
                    FailurePolicy::Disconnect if e == WriteError::Closed => {
                        self.on_link_lost(channel, sink);
                    }
                    FailurePolicy::Disconnect => {
                        warn!("{err}");
                        sink.emit(&AppEvent::Warning(err.clone()));
                    }
                    FailurePolicy::Ignore => {
                        debug!("Neutral command not delivered: {e}");
                    }
                }
                Err(err)
            }
        }
    }

    /// Connected → Disconnecting: stop sampling, send neutral, arm grace.
    fn begin_disconnect(&mut self, cause: DisconnectCause, now: Instant, sink: &mut impl EventSink) {
        self.sampler.stop(&mut self.tilt);
        let _ = self.write_line(0, 0, FailurePolicy::Ignore, now, sink);

        let grace = Duration::from_millis(u64::from(self.config.disconnect_grace_ms));
        let pending = PendingDisconnect::armed(now, grace);
        let trigger = match cause {
            DisconnectCause::SendRejected => Trigger::SendRejected { pending },
            _ => Trigger::DisconnectRequested { pending },
        };
        if self.transition(trigger, sink).is_ok() {
            info!("Closing in {} ms", grace.as_millis());
        }
    }

    /// Close `channel` and report the link down.
    fn release(&mut self, channel: ChannelId, cause: DisconnectCause, sink: &mut impl EventSink) {
        self.transport.close(channel);
        self.stats.record_disconnect();
        info!("Closed channel {} ({cause:?})", channel.0);
        sink.emit(&AppEvent::Disconnected { cause });
    }
}
