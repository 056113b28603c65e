//! Integration tests for the DriveService → FSM → transport pipeline.
//!
//! Every scenario runs against the mock adapters with explicit timestamps,
//! so grace periods and late callbacks are exercised deterministically.

use embassy_time::{Duration, Instant};

use tiltdrive::app::events::AppEvent;
use tiltdrive::app::service::DriveService;
use tiltdrive::config::DriveConfig;
use tiltdrive::control::{MotorCommand, TiltSample};
use tiltdrive::error::{Error, reason};
use tiltdrive::fsm::{DisconnectCause, LinkState};
use tiltdrive::protocol::transport::{AttemptId, ChannelId, DeviceHandle, WriteError};

use super::mock_link::{LinkCall, MockLink, MockTilt, RecordingSink};

type Svc = DriveService<MockLink, MockTilt>;

fn t(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

fn rover() -> DeviceHandle {
    DeviceHandle::new("98:D3:31:F5:2B:10", "rover").unwrap()
}

fn session(link: MockLink) -> (Svc, RecordingSink) {
    (
        DriveService::new(DriveConfig::default(), link, MockTilt::default()),
        RecordingSink::new(),
    )
}

fn open(svc: &mut Svc, sink: &mut RecordingSink, channel: u32) -> AttemptId {
    let attempt = svc.connect(rover(), sink).unwrap();
    svc.on_opened(attempt, ChannelId(channel), t(0), sink);
    attempt
}

fn live_subscription(svc: &Svc) -> tiltdrive::sensors::tilt::SubscriptionId {
    svc.tilt_source().live().expect("sampler should be subscribed")
}

// ── Connect ───────────────────────────────────────────────────

#[test]
fn connect_then_opened_sends_handshake_once_and_starts_sampling() {
    let (mut svc, mut sink) = session(MockLink::new());

    let attempt = svc.connect(rover(), &mut sink).unwrap();
    assert_eq!(svc.state(), LinkState::Connecting);
    assert_eq!(svc.transport().last_attempt(), Some(attempt));
    assert!(!svc.is_sampling());

    svc.on_opened(attempt, ChannelId(1), t(0), &mut sink);
    assert_eq!(svc.state(), LinkState::Connected);
    assert!(svc.is_sampling());
    assert_eq!(
        svc.tilt_source().active.map(|(_, every)| every),
        Some(Duration::from_millis(100))
    );
    assert_eq!(svc.transport().lines(), vec!["255$255$\n"]);
    assert!(matches!(
        sink.events.iter().find(|e| matches!(e, AppEvent::Connected { .. })),
        Some(AppEvent::Connected { device }) if device.name.as_str() == "rover"
    ));
}

#[test]
fn connect_while_connected_is_rejected_without_side_effects() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    let calls_before = svc.transport().calls.len();
    let events_before = sink.events.len();

    let err = svc.connect(rover(), &mut sink).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidState {
            op: "connect",
            state: LinkState::Connected
        }
    );
    assert_eq!(svc.state(), LinkState::Connected);
    assert_eq!(svc.transport().calls.len(), calls_before);
    assert_eq!(sink.events.len(), events_before);
}

#[test]
fn connect_while_connecting_is_rejected() {
    let (mut svc, mut sink) = session(MockLink::new());
    svc.connect(rover(), &mut sink).unwrap();
    assert!(svc.connect(rover(), &mut sink).is_err());
    assert_eq!(svc.transport().opens(), 1);
    assert_eq!(svc.state(), LinkState::Connecting);
}

#[test]
fn async_open_failure_returns_to_disconnected() {
    let (mut svc, mut sink) = session(MockLink::new());
    let attempt = svc.connect(rover(), &mut sink).unwrap();
    svc.on_open_failed(attempt, reason("socket refused"), &mut sink);

    assert_eq!(svc.state(), LinkState::Disconnected);
    let err = svc.last_error().cloned().unwrap();
    assert_eq!(err, Error::TransportOpenFailed(reason("socket refused")));
    assert_eq!(err.to_string(), "could not connect: socket refused");
    assert!(matches!(sink.last(), Some(AppEvent::ConnectFailed(_))));
    assert!(!svc.is_sampling());
}

#[test]
fn synchronous_open_failure_is_reported_the_same_way() {
    let mut link = MockLink::new();
    link.refuse_open = Some("bluetooth off");
    let (mut svc, mut sink) = session(link);

    assert!(svc.connect(rover(), &mut sink).is_ok());
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert_eq!(
        svc.last_error(),
        Some(&Error::TransportOpenFailed(reason("bluetooth off")))
    );
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ConnectFailed(_))),
        1,
        "reported exactly once"
    );

    // Not retried; a fresh connect is allowed.
    assert_eq!(svc.transport().opens(), 1);
    assert!(svc.connect(rover(), &mut sink).is_ok());
    assert_eq!(svc.state(), LinkState::Connecting);
}

#[test]
fn late_result_for_superseded_attempt_is_ignored() {
    let (mut svc, mut sink) = session(MockLink::new());
    let first = svc.connect(rover(), &mut sink).unwrap();
    svc.on_open_failed(first, reason("timeout"), &mut sink);
    let second = svc.connect(rover(), &mut sink).unwrap();
    assert_ne!(first, second);

    // The first attempt's channel shows up after all: closed, not adopted.
    svc.on_opened(first, ChannelId(5), t(0), &mut sink);
    assert_eq!(svc.state(), LinkState::Connecting);
    assert_eq!(svc.transport().closed(), vec![ChannelId(5)]);
    assert_eq!(svc.stats().stale_results, 1);

    svc.on_opened(second, ChannelId(6), t(0), &mut sink);
    assert_eq!(svc.state(), LinkState::Connected);
    assert_eq!(svc.channel(), Some(ChannelId(6)));
}

#[test]
fn duplicate_open_for_live_channel_leaves_it_open() {
    let (mut svc, mut sink) = session(MockLink::new());
    let attempt = open(&mut svc, &mut sink, 1);

    svc.on_opened(attempt, ChannelId(1), t(10), &mut sink);
    assert_eq!(svc.state(), LinkState::Connected);
    assert_eq!(svc.channel(), Some(ChannelId(1)));
    assert!(svc.transport().closed().is_empty());
    assert_eq!(svc.transport().lines(), vec!["255$255$\n"], "no second handshake");
    assert_eq!(svc.stats().stale_results, 1);

    svc.send(MotorCommand::new(20, 20), t(20), &mut sink).unwrap();
    assert_eq!(svc.transport().lines().last(), Some(&"20$20$\n"));
}

// ── Disconnect ────────────────────────────────────────────────

#[test]
fn disconnect_sends_neutral_then_closes_after_grace() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);

    svc.disconnect(t(1_000), &mut sink).unwrap();
    assert_eq!(svc.state(), LinkState::Disconnecting);
    assert_eq!(svc.transport().lines(), vec!["255$255$\n", "0$0$\n"]);
    assert!(!svc.is_sampling());
    assert!(svc.transport().closed().is_empty());
    assert_eq!(svc.next_deadline(), Some(t(1_500)));

    svc.poll(t(1_499), &mut sink);
    assert_eq!(svc.state(), LinkState::Disconnecting);
    assert!(svc.transport().closed().is_empty());

    svc.poll(t(1_500), &mut sink);
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert_eq!(svc.transport().closed(), vec![ChannelId(1)]);
    assert_eq!(svc.channel(), None);
    assert!(matches!(
        sink.last(),
        Some(AppEvent::Disconnected {
            cause: DisconnectCause::UserRequested
        })
    ));

    // Grace fires once only.
    svc.poll(t(5_000), &mut sink);
    assert_eq!(svc.transport().closed().len(), 1);
}

#[test]
fn disconnect_while_disconnected_has_no_effect() {
    let (mut svc, mut sink) = session(MockLink::new());
    let err = svc.disconnect(t(0), &mut sink).unwrap_err();
    assert_eq!(err.to_string(), "cannot disconnect while disconnected");
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert!(svc.transport().calls.is_empty());
    assert!(sink.events.is_empty());
}

#[test]
fn disconnect_while_connecting_has_no_effect() {
    let (mut svc, mut sink) = session(MockLink::new());
    svc.connect(rover(), &mut sink).unwrap();
    assert!(svc.disconnect(t(0), &mut sink).is_err());
    assert_eq!(svc.state(), LinkState::Connecting);
}

#[test]
fn disconnect_is_idempotent_while_disconnecting() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    svc.disconnect(t(0), &mut sink).unwrap();
    svc.disconnect(t(200), &mut sink).unwrap();

    assert_eq!(svc.transport().lines(), vec!["255$255$\n", "0$0$\n"]);
    assert_eq!(svc.next_deadline(), Some(t(500)), "grace not re-armed");
}

// ── Sending ───────────────────────────────────────────────────

#[test]
fn tilt_sample_is_mapped_and_sent() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    let sub = live_subscription(&svc);

    svc.on_subscribed_sample(sub, TiltSample::new(3.0, -1.0), t(100), &mut sink);
    assert_eq!(svc.transport().lines().last(), Some(&"-132$-170$\n"));
    assert!(matches!(
        sink.last(),
        Some(AppEvent::Drive(d)) if d.command == MotorCommand::new(-132, -170)
    ));
}

#[test]
fn samples_from_old_subscription_are_discarded_after_reconnect() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    let old = live_subscription(&svc);
    svc.disconnect(t(0), &mut sink).unwrap();
    svc.poll(t(500), &mut sink);

    open(&mut svc, &mut sink, 2);
    let lines_before = svc.transport().lines().len();
    svc.on_subscribed_sample(old, TiltSample::new(4.0, 0.0), t(600), &mut sink);
    assert_eq!(svc.transport().lines().len(), lines_before);
    assert_eq!(svc.stats().stale_samples, 1);
}

#[test]
fn send_without_channel_is_dropped_and_counted() {
    let (mut svc, mut sink) = session(MockLink::new());
    assert_eq!(svc.send(MotorCommand::new(100, 100), t(0), &mut sink), Ok(()));
    assert!(svc.transport().calls.is_empty());
    assert_eq!(svc.stats().commands_dropped, 1);

    open(&mut svc, &mut sink, 1);
    svc.disconnect(t(0), &mut sink).unwrap();
    svc.send(MotorCommand::new(100, 100), t(10), &mut sink).unwrap();
    assert_eq!(
        svc.transport().lines(),
        vec!["255$255$\n", "0$0$\n"],
        "nothing but neutral after disconnect"
    );
}

#[test]
fn out_of_range_command_is_a_programming_error() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    assert_eq!(
        svc.send(MotorCommand::new(0, -300), t(0), &mut sink),
        Err(Error::InvalidCommand)
    );
    assert_eq!(svc.state(), LinkState::Connected);
}

#[test]
fn rejected_write_starts_autonomous_disconnect() {
    let link = MockLink::with_writes([Ok(()), Err(WriteError::InvalidArgument)]);
    let (mut svc, mut sink) = session(link);
    open(&mut svc, &mut sink, 1);

    let err = svc
        .send(MotorCommand::new(50, 50), t(100), &mut sink)
        .unwrap_err();
    assert_eq!(err, Error::SendFailed(WriteError::InvalidArgument));
    assert_eq!(svc.state(), LinkState::Disconnecting);
    assert_eq!(svc.transport().lines(), vec!["255$255$\n", "0$0$\n"]);
    assert_eq!(svc.last_error(), Some(&err));

    svc.poll(t(600), &mut sink);
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert!(matches!(
        sink.last(),
        Some(AppEvent::Disconnected {
            cause: DisconnectCause::SendRejected
        })
    ));
}

#[test]
fn rejected_neutral_does_not_retrigger_disconnect() {
    let link = MockLink::with_writes([
        Ok(()),
        Err(WriteError::InvalidArgument),
        Err(WriteError::InvalidArgument),
    ]);
    let (mut svc, mut sink) = session(link);
    open(&mut svc, &mut sink, 1);

    let _ = svc.send(MotorCommand::new(50, 50), t(100), &mut sink);
    assert_eq!(svc.state(), LinkState::Disconnecting);
    assert_eq!(svc.stats().send_failures, 2);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::StateChanged {
                to: LinkState::Disconnecting,
                ..
            }
        )),
        1
    );
}

#[test]
fn transient_write_error_keeps_link_up() {
    let link = MockLink::with_writes([Ok(()), Err(WriteError::Io)]);
    let (mut svc, mut sink) = session(link);
    open(&mut svc, &mut sink, 1);

    assert!(svc.send(MotorCommand::new(5, 5), t(0), &mut sink).is_err());
    assert_eq!(svc.state(), LinkState::Connected);
    assert!(svc.is_sampling());
    assert!(matches!(
        sink.last(),
        Some(AppEvent::Warning(Error::SendFailed(WriteError::Io)))
    ));
    svc.send(MotorCommand::new(5, 5), t(100), &mut sink).unwrap();
    assert_eq!(svc.transport().lines().last(), Some(&"5$5$\n"));
}

#[test]
fn closed_channel_on_write_is_treated_as_link_loss() {
    let link = MockLink::with_writes([Ok(()), Err(WriteError::Closed), Err(WriteError::Closed)]);
    let (mut svc, mut sink) = session(link);
    open(&mut svc, &mut sink, 1);

    assert_eq!(
        svc.send(MotorCommand::new(5, 5), t(0), &mut sink),
        Err(Error::SendFailed(WriteError::Closed))
    );
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert_eq!(svc.channel(), None);
    assert!(!svc.is_sampling());
    assert_eq!(svc.next_deadline(), None, "no grace period");
    assert!(svc.transport().closed().is_empty(), "nothing left to close");
    assert_eq!(svc.last_error(), Some(&Error::LinkLost));
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::Disconnected {
                cause: DisconnectCause::LinkLost
            }
        )),
        1
    );

    // Later commands are dropped instead of hitting the dead channel.
    svc.send(MotorCommand::new(5, 5), t(100), &mut sink).unwrap();
    assert_eq!(svc.stats().commands_dropped, 1);
    assert_eq!(svc.stats().send_failures, 1);
}

// ── Link loss ─────────────────────────────────────────────────

#[test]
fn link_loss_while_connected_skips_grace_and_close() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);

    svc.on_link_lost(ChannelId(1), &mut sink);
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert!(!svc.is_sampling());
    assert!(svc.transport().closed().is_empty(), "lost channel is not closed");
    assert_eq!(svc.last_error(), Some(&Error::LinkLost));
    assert!(matches!(
        sink.last(),
        Some(AppEvent::Disconnected {
            cause: DisconnectCause::LinkLost
        })
    ));
}

#[test]
fn link_loss_while_disconnecting_cancels_grace() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    svc.disconnect(t(0), &mut sink).unwrap();

    svc.on_link_lost(ChannelId(1), &mut sink);
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert_eq!(svc.next_deadline(), None);

    svc.poll(t(1_000), &mut sink);
    assert!(svc.transport().closed().is_empty());
}

#[test]
fn loss_of_unknown_channel_is_ignored() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    svc.on_link_lost(ChannelId(9), &mut sink);
    assert_eq!(svc.state(), LinkState::Connected);
}

// ── Teardown ──────────────────────────────────────────────────

#[test]
fn teardown_while_disconnecting_closes_immediately() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    svc.disconnect(t(0), &mut sink).unwrap();

    svc.teardown(&mut sink);
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert_eq!(svc.transport().closed(), vec![ChannelId(1)]);
    assert_eq!(svc.next_deadline(), None);

    svc.poll(t(1_000), &mut sink);
    assert_eq!(svc.transport().closed().len(), 1, "no second close");
}

#[test]
fn teardown_while_connected_skips_neutral() {
    let (mut svc, mut sink) = session(MockLink::new());
    open(&mut svc, &mut sink, 1);
    svc.teardown(&mut sink);
    assert_eq!(svc.transport().lines(), vec!["255$255$\n"]);
    assert_eq!(svc.transport().closed(), vec![ChannelId(1)]);
    assert!(svc.tilt_source().active.is_none());
}

#[test]
fn teardown_while_connecting_closes_late_channel() {
    let (mut svc, mut sink) = session(MockLink::new());
    let attempt = svc.connect(rover(), &mut sink).unwrap();
    svc.teardown(&mut sink);
    assert_eq!(svc.state(), LinkState::Disconnected);

    svc.on_opened(attempt, ChannelId(3), t(0), &mut sink);
    assert_eq!(svc.state(), LinkState::Disconnected);
    assert_eq!(svc.transport().closed(), vec![ChannelId(3)]);
    assert_eq!(svc.transport().lines(), Vec::<&str>::new());
}

#[test]
fn session_is_terminal_after_teardown() {
    let (mut svc, mut sink) = session(MockLink::new());
    svc.teardown(&mut sink);
    assert_eq!(svc.connect(rover(), &mut sink), Err(Error::SessionClosed));
    assert_eq!(svc.transport().opens(), 0);
    assert!(
        !svc.transport()
            .calls
            .iter()
            .any(|c| matches!(c, LinkCall::Open { .. }))
    );
}
