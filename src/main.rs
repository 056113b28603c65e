//! TiltDrive: demo entry point.
//!
//! Drives an in-process loopback receiver with a scripted tilt sweep,
//! then disconnects gracefully and prints the link statistics.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  LoopbackTransport     ScriptedTilt / TiltFeed  LogEventSink │
//! │  (SerialTransport)     (TiltSource)             (EventSink)  │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            DriveService (owner, pure logic)            │  │
//! │  │  FSM · Sampler · Mixer · Codec                         │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  MAILBOX ──▶ runtime::run (LocalExecutor + embassy timer)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use embassy_time::{Duration, Instant, Timer};
use log::info;

use tiltdrive::adapters::log_sink::LogEventSink;
use tiltdrive::adapters::loopback::LoopbackTransport;
use tiltdrive::adapters::scripted_tilt::ScriptedTilt;
use tiltdrive::app::commands::UserCommand;
use tiltdrive::app::service::DriveService;
use tiltdrive::config::{DriveConfig, MixerConfig};
use tiltdrive::events::{Mailbox, Message, post};
use tiltdrive::protocol::transport::DeviceHandle;
use tiltdrive::runtime;

/// Owner mailbox shared by every producer.
static MAILBOX: Mailbox = Mailbox::new();

/// Slack after the grace period before tearing down.
const TEARDOWN_SLACK: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(version, about = "Tilt-steered differential drive over a loopback link")]
struct Args {
    /// Receiver address
    #[arg(long, default_value = "98:D3:31:F5:2B:10")]
    address: String,

    /// Receiver display name
    #[arg(long, default_value = "rover")]
    name: String,

    /// JSON config override (partial; missing fields keep defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the wide mixer preset (G=5.5, D=0.7)
    #[arg(long)]
    wide: bool,

    /// How long to drive before disconnecting (milliseconds)
    #[arg(long, default_value_t = 3_000)]
    drive_ms: u64,

    /// Simulate a receiver that never answers
    #[arg(long)]
    unreachable: bool,

    /// Log filter (e.g. "info", "tiltdrive=debug")
    #[arg(long, default_value = "info")]
    log: String,
}

fn load_config(args: &Args) -> Result<DriveConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            DriveConfig::from_json(&json)
                .with_context(|| format!("loading {}", path.display()))?
        }
        None => DriveConfig::default(),
    };
    if args.wide {
        config.mixer = MixerConfig::wide();
    }
    config.validate().context("validating config")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_env_filter(args.log.as_str()).init();

    let config = load_config(&args)?;
    info!(
        "Mixer G={} D={} max={} | sample {} ms | grace {} ms",
        config.mixer.sensor_range,
        config.mixer.dead_zone,
        config.mixer.max_pwm,
        config.sample_interval_ms,
        config.disconnect_grace_ms,
    );

    let device = DeviceHandle::new(&args.address, &args.name).context("invalid --address")?;
    let transport = if args.unreachable {
        LoopbackTransport::unreachable(&MAILBOX)
    } else {
        LoopbackTransport::new(&MAILBOX)
    };
    let tilt = ScriptedTilt::new();
    // Sweep slightly past the sensor range so clamping shows up.
    let feed = tilt.feed(config.mixer.sensor_range * 1.2);
    let grace = Duration::from_millis(u64::from(config.disconnect_grace_ms));
    let drive_for = Duration::from_millis(args.drive_ms);

    let mut service = DriveService::new(config, transport, tilt);
    let mut sink = LogEventSink::new();

    let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

    // Scripted user: connect, drive, disconnect, tear down.
    executor
        .spawn(async move {
            post(&MAILBOX, Message::Command(UserCommand::Connect(device)));
            feed.run(&MAILBOX, Instant::now() + drive_for).await;
            post(&MAILBOX, Message::Command(UserCommand::Disconnect));
            Timer::after(grace + TEARDOWN_SLACK).await;
            post(&MAILBOX, Message::Command(UserCommand::Teardown));
        })
        .detach();

    futures_lite::future::block_on(executor.run(runtime::run(&mut service, &MAILBOX, &mut sink)));

    if let Some(e) = service.last_error() {
        info!("Last error: {e}");
    }
    let receiver = service.transport().receiver_log();
    if let Some(last) = receiver.last {
        info!(
            "Receiver got {} lines, last {}/{}",
            receiver.lines, last.left, last.right
        );
    }
    let stats = serde_json::to_string_pretty(service.stats()).context("encoding link stats")?;
    println!("{stats}");
    Ok(())
}
