//! # Block Check Character
//!
//! The BCC is the XOR of the 7-bit values of every byte after the first SOH or
//! STX of a frame, up to and including the ETX (or EOT for partial blocks).
//! It is appended as the last byte of the frame.
//!
//! ```rust
//! use iec62056_rs::iec::bcc::{add_bcc, bcc_valid};
//!
//! let frame = add_bcc(b"\x01B0\x03").unwrap();
//! assert_eq!(frame, b"\x01B0\x03q");
//! assert!(bcc_valid(&frame));
//! ```

use crate::constants::{SOH, STX};
use crate::error::{Iec62056Error, Result};

/// XOR of the 7-bit values of `data`.
pub fn calculate_bcc(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |bcc, b| (bcc ^ (b & 0x7F)) & 0x7F)
}

/// Index of the first byte covered by the BCC.
fn span_start(message: &[u8]) -> Option<usize> {
    message
        .iter()
        .position(|&b| b == SOH || b == STX)
        .map(|i| i + 1)
}

/// Returns the message with its BCC appended.
pub fn add_bcc(message: &[u8]) -> Result<Vec<u8>> {
    let start = span_start(message)
        .ok_or_else(|| Iec62056Error::framing("no SOH or STX found in message", message))?;
    let mut out = Vec::with_capacity(message.len() + 1);
    out.extend_from_slice(message);
    out.push(calculate_bcc(&message[start..]));
    Ok(out)
}

/// Checks the trailing BCC of a frame. Never mutates and never panics.
pub fn bcc_valid(frame: &[u8]) -> bool {
    verify_bcc(frame).is_ok()
}

/// Like [`bcc_valid`] but reports what went wrong.
pub fn verify_bcc(frame: &[u8]) -> Result<()> {
    let Some((&expected, body)) = frame.split_last() else {
        return Err(Iec62056Error::framing("empty frame", frame));
    };
    let start = span_start(body)
        .ok_or_else(|| Iec62056Error::framing("no SOH or STX found in frame", frame))?;
    let calculated = calculate_bcc(&body[start..]);
    if calculated != expected {
        return Err(Iec62056Error::Checksum {
            expected,
            calculated,
            raw: frame.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_message_bcc() {
        // SOH B 0 ETX -> 'B' ^ '0' ^ ETX = 0x71
        assert_eq!(calculate_bcc(b"B0\x03"), 0x71);
        assert_eq!(add_bcc(b"\x01B0\x03").unwrap(), b"\x01B0\x03\x71".to_vec());
    }

    #[test]
    fn test_span_starts_after_stx() {
        let frame = add_bcc(b"\x02C.1.0(12345678)\r\n!\r\n\x03").unwrap();
        let expected = calculate_bcc(b"C.1.0(12345678)\r\n!\r\n\x03");
        assert_eq!(*frame.last().unwrap(), expected);
        assert!(bcc_valid(&frame));
    }

    #[test]
    fn test_high_bit_is_ignored() {
        assert_eq!(calculate_bcc(&[0x81, 0x02]), calculate_bcc(&[0x01, 0x02]));
    }

    #[test]
    fn test_corrupted_frame_is_rejected() {
        let mut frame = add_bcc(b"\x02(1)\x03").unwrap();
        frame[2] = b'2';
        assert!(!bcc_valid(&frame));
        assert!(matches!(
            verify_bcc(&frame),
            Err(Iec62056Error::Checksum { .. })
        ));
    }

    #[test]
    fn test_missing_start_is_framing_error() {
        assert!(matches!(add_bcc(b"abc"), Err(Iec62056Error::Framing { .. })));
        assert!(matches!(verify_bcc(b"abc"), Err(Iec62056Error::Framing { .. })));
        assert!(!bcc_valid(b""));
    }
}
