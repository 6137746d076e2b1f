//! IEC 62056-21 mode C protocol stack: checksum, messages, timing, the
//! transport capability with its serial and TCP implementations, and the
//! session engine.

pub mod bcc;
pub mod client;
pub mod link;
pub mod message;
pub mod mock;
pub mod serial;
pub mod tcp;
pub mod timing;
pub mod transport;

pub use bcc::{add_bcc, bcc_valid, calculate_bcc, verify_bcc};
pub use client::{ClientBuilder, ClientConfig, Iec6205621Client, SessionState};
pub use message::{
    AckOptionSelectMessage, AnswerDataMessage, Command, CommandMessage, DataSet,
    IdentificationMessage, RequestMessage, Response, WireMessage,
};
pub use serial::{SerialConfig, SerialTransport};
pub use tcp::TcpTransport;
pub use timing::{Delay, ReactionTimer, TokioDelay};
pub use transport::Transport;
