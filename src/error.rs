//! # IEC 62056-21 Error Handling
//!
//! This module defines the Iec62056Error enum, which represents the different
//! error types that can occur in the iec62056-rs crate.
//!
//! None of these errors are retried internally. After any error raised during
//! a session the caller should disconnect and build a new client instead of
//! resuming; the meter may still be waiting in the middle of a handshake.

use crate::util::hex::encode_hex;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Iec62056Error>;

/// Represents the different error types that can occur in the crate.
#[derive(Debug, Error)]
pub enum Iec62056Error {
    /// The transport needs a device address to reach a meter and none was set.
    #[error("Transport {transport} requires a device address and none was supplied")]
    MissingDeviceAddress { transport: String },

    /// A mode name outside the mode C table was requested.
    #[error("Unknown mode: {0}")]
    UnknownMode(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A message holds text that cannot be put on the wire unchanged.
    #[error("Cannot encode message: {0}")]
    InvalidMessage(String),

    /// Received bytes match no known message grammar.
    #[error("Framing error: {context} (raw: {})", encode_hex(.raw))]
    Framing { context: String, raw: Vec<u8> },

    /// Well-formed frame whose block check character does not validate.
    #[error("Invalid BCC: expected 0x{expected:02X}, calculated 0x{calculated:02X} (raw: {})", encode_hex(.raw))]
    Checksum {
        expected: u8,
        calculated: u8,
        raw: Vec<u8>,
    },

    /// A device-reported fault recognised by the error classifier.
    #[error("Device error {code} at {}", .address.as_deref().unwrap_or("<no address>"))]
    Device {
        code: String,
        address: Option<String>,
    },

    /// A single-value read returned no data set.
    #[error("Read returned no data")]
    NoDataReturned,

    /// A single-value read returned more than one data set.
    #[error("Read of one value returned {0}")]
    TooManyValuesReturned(usize),

    /// The meter answered a write command with NAK.
    #[error("Received NAK upon sending {request}")]
    WriteRejected { request: String },

    /// The meter answered a password with NAK.
    #[error("Meter rejected the password")]
    PasswordRejected,

    /// The meter answered a write or password command with neither ACK nor NAK.
    #[error("Received invalid response 0x{byte:02X} to request {request}")]
    UnexpectedResponse { byte: u8, request: String },

    /// Underlying I/O failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport gave up waiting for the meter.
    #[error("Timeout during {operation}")]
    Timeout { operation: String },

    /// Option select attempted before an identification message was parsed.
    #[error("No identification received; startup must run before option select")]
    NotIdentified,

    /// Switchover character outside the mode C baud table.
    #[error("Unknown switchover baud rate character: {0:?}")]
    UnknownBaudrate(char),

    /// A profile date string is not `YYMMDDhhmm` or not a real date.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Start date of a profile read lies after its end date.
    #[error("Invalid date range: start is after end")]
    InvalidDateRange,

    /// No profile layout is known for this manufacturer.
    #[error("Unsupported manufacturer for profile read: {0}")]
    UnsupportedManufacturer(String),

    /// The session was ended with a break message.
    #[error("Session closed")]
    SessionClosed,
}

impl Iec62056Error {
    pub fn framing(context: impl Into<String>, raw: &[u8]) -> Self {
        Iec62056Error::Framing {
            context: context.into(),
            raw: raw.to_vec(),
        }
    }

    /// Errors caused by how the client was set up rather than by the meter.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Iec62056Error::MissingDeviceAddress { .. }
                | Iec62056Error::UnknownMode(_)
                | Iec62056Error::Config(_)
                | Iec62056Error::InvalidMessage(_)
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Iec62056Error::Transport(_) | Iec62056Error::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for Iec62056Error {
    fn from(e: std::io::Error) -> Self {
        Iec62056Error::Transport(e.to_string())
    }
}
