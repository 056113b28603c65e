//! Async owner loop.
//!
//! Drains the [`Mailbox`] into the [`DriveService`] one message at a time
//! and sleeps until either the next message or the service's next
//! deadline, whichever comes first.  No polling interval: the timer is
//! wake-based (`embassy_time::Timer`) and the mailbox wakes on send.
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────┐
//!  │  owner task                                          │
//!  │                                                      │
//!  │   or( mailbox.receive() , Timer::at(next_deadline) ) │
//!  │            │                        │                │
//!  │       handle(msg)                   │                │
//!  │            └──────────┬─────────────┘                │
//!  │                    poll(now)                         │
//!  └──────────────────────────────────────────────────────┘
//! ```

use embassy_time::{Instant, Timer};
use futures_lite::future;
use log::info;

use crate::app::ports::{EventSink, TiltSource};
use crate::app::service::{DriveService, Flow};
use crate::events::{Mailbox, Message};
use crate::protocol::transport::SerialTransport;

enum Wake {
    Message(Message),
    Deadline,
}

/// Run the owner until a teardown message has been handled.
pub async fn run<T, S>(
    service: &mut DriveService<T, S>,
    mailbox: &Mailbox,
    sink: &mut impl EventSink,
) where
    T: SerialTransport,
    S: TiltSource,
{
    info!("Owner loop started");
    loop {
        let wake = match service.next_deadline() {
            Some(deadline) => {
                future::or(async { Wake::Message(mailbox.receive().await) }, async {
                    Timer::at(deadline).await;
                    Wake::Deadline
                })
                .await
            }
            None => Wake::Message(mailbox.receive().await),
        };

        let now = Instant::now();
        if let Wake::Message(message) = wake {
            if service.handle(message, now, sink) == Flow::Exit {
                break;
            }
        }
        service.poll(now, sink);
    }
    info!("Owner loop stopped");
}
