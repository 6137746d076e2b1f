//! # Hex and Frame Rendering Utilities
//!
//! Raw frames end up in error messages and debug logs so they can be matched
//! against a protocol analyzer trace. Two renderings are provided: plain hex
//! (via the `hex` crate) and a readable form where control characters are
//! spelled out.
//!
//! ## Usage
//!
//! ```rust
//! use iec62056_rs::util::hex::{encode_hex, format_frame};
//!
//! let frame = b"\x01B0\x03q";
//! assert_eq!(encode_hex(frame), "0142300371");
//! assert_eq!(format_frame(frame), "<SOH>B0<ETX>q");
//! ```

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Render a frame as text with the IEC 62056-21 control characters named.
pub fn format_frame(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() + 8);
    for &byte in data {
        match byte {
            0x00 => out.push_str("<NUL>"),
            0x01 => out.push_str("<SOH>"),
            0x02 => out.push_str("<STX>"),
            0x03 => out.push_str("<ETX>"),
            0x04 => out.push_str("<EOT>"),
            0x06 => out.push_str("<ACK>"),
            0x15 => out.push_str("<NAK>"),
            b'\r' => out.push_str("<CR>"),
            b'\n' => out.push_str("<LF>"),
            b if b.is_ascii_graphic() || b == b' ' => out.push(b as char),
            b => out.push_str(&format!("<{:02X}>", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_lowercase() {
        assert_eq!(encode_hex(&[0x01, 0x50, 0xAB]), "0150ab");
    }

    #[test]
    fn test_format_frame_names_control_chars() {
        assert_eq!(
            format_frame(b"\x060500\r\n"),
            "<ACK>0500<CR><LF>"
        );
        assert_eq!(format_frame(&[0x02, 0x7F, 0x03]), "<STX><7F><ETX>");
    }
}
