//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements      | Connects to                    |
//! |-----------------|-----------------|--------------------------------|
//! | `log_sink`      | EventSink       | `log` facade                   |
//! | `loopback`      | SerialTransport | In-process emulated receiver   |
//! | `scripted_tilt` | TiltSource      | Figure-eight sweep feed task   |

pub mod log_sink;
pub mod loopback;
pub mod scripted_tilt;
