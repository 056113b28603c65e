//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the `log`
//! facade (the binary routes it to stderr).  A UI adapter would implement
//! the same trait and drive the status line and toasts instead.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Drive(t) => {
                debug!(
                    "DRIVE | x={:+.2} y={:+.2} | left={:+4} right={:+4}",
                    t.sample.x, t.sample.y, t.command.left, t.command.right,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.name(), to.name());
            }
            AppEvent::Connected { device } => {
                info!("LINK  | connected to {}", device);
            }
            AppEvent::ConnectFailed(e) => {
                warn!("LINK  | {}", e);
            }
            AppEvent::Disconnected { cause } => {
                info!("LINK  | disconnected ({:?})", cause);
            }
            AppEvent::Warning(e) => {
                warn!("WARN  | {}", e);
            }
        }
    }
}
