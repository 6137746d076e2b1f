//! # Utility Modules
//!
//! Helpers shared by the codec, the transports and error reporting: hex and
//! control-character rendering of raw frames, and latin-1 text conversion.

pub mod hex;
pub mod text;

pub use hex::{encode_hex, format_frame};
pub use text::{latin1_decode, latin1_encode};
