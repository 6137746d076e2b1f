//! # iec62056-rs - A Rust Crate for IEC 62056-21 Meter Readout
//!
//! The iec62056-rs crate implements the client side of IEC 62056-21 (formerly
//! IEC 61107) transmission mode C, the optical-port and serial readout protocol
//! spoken by electricity, gas and water meters.
//!
//! ## Features
//!
//! - Mode C handshake: request, identification, option select and baud-rate switchover
//! - Standard readout, programming mode, single register read and write
//! - BCC-protected framing with partial-block reassembly
//! - Load-profile reads with manufacturer-specific arranging (Luna, Makel)
//! - Pluggable error classification of answers (Elster LIS-200)
//! - Serial (7E1 via tokio-serial) and TCP gateway transports
//! - Battery-powered meter wake-up sequence
//! - Support for logging and error handling
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! iec62056-rs = "0.1.0"
//! ```
//!
//! ```rust
//! use iec62056_rs::{
//!     Iec6205621Client, ClientConfig, MeterManager, DataSet, Iec62056Error,
//!     init_logger, log_info,
//! };
//! ```

pub mod constants;
pub mod error;
pub mod iec;
pub mod logging;
pub mod meter_manager;
pub mod payload;
pub mod util;
pub mod vendors;

pub use crate::error::{Iec62056Error, Result};
pub use crate::logging::{init_logger, log_info, EventSink, LogSink, SessionEvent};

// Protocol
pub use constants::{BaudRate, Mode};
pub use iec::client::{ClientBuilder, ClientConfig, Iec6205621Client, SessionState};
pub use iec::message::{
    AnswerDataMessage, Command, CommandMessage, DataSet, IdentificationMessage, Response,
    WireMessage,
};
pub use iec::serial::{SerialConfig, SerialTransport};
pub use iec::tcp::TcpTransport;
pub use iec::transport::Transport;
pub use meter_manager::{to_json, MeterManager, StandardData};
pub use payload::{ProfileData, ProfileLayout, ProfileValues};

// Vendor extension system
pub use vendors::{ClassifierKind, ErrorClassifier, Lis200Classifier, NoopClassifier};
