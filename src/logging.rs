use crate::iec::client::SessionState;
use crate::util::hex::{encode_hex, format_frame};
use log::{debug, info, log_enabled, warn, Level};
use std::time::Duration;

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Events emitted by the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A frame was handed to the transport.
    RequestSent {
        operation: &'static str,
        bytes: Vec<u8>,
    },
    /// A complete frame was read from the transport.
    FrameReceived { bytes: Vec<u8> },
    /// A frame was well-formed but its BCC did not validate.
    ChecksumFailure {
        expected: u8,
        calculated: u8,
        bytes: Vec<u8>,
    },
    StateTransition {
        from: SessionState,
        to: SessionState,
    },
    /// The engine waited for the meter.
    Rested { duration: Duration },
}

/// Structured sink for [`SessionEvent`]s, injected into the client.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SessionEvent);
}

/// Default sink writing events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &SessionEvent) {
        match event {
            SessionEvent::RequestSent { operation, bytes } => {
                debug!(
                    "{operation}: sent {} [{}]",
                    format_frame(bytes),
                    encode_hex(bytes)
                );
            }
            SessionEvent::FrameReceived { bytes } => {
                debug!("received {} [{}]", format_frame(bytes), encode_hex(bytes));
            }
            SessionEvent::ChecksumFailure {
                expected,
                calculated,
                bytes,
            } => {
                warn!(
                    "BCC mismatch (expected 0x{expected:02X}, calculated 0x{calculated:02X}) in {}",
                    encode_hex(bytes)
                );
            }
            SessionEvent::StateTransition { from, to } => {
                info!("session state {from:?} -> {to:?}");
            }
            SessionEvent::Rested { duration } => {
                debug!("rested {duration:?}");
            }
        }
    }
}
