//! Latin-1 text conversion.
//!
//! IEC 62056-21 frames carry 7-bit ISO 646 text. Decoding maps each byte to
//! the `char` with the same code point so no byte is ever lost; encoding does
//! the reverse and replaces characters above U+00FF with `?`.

pub fn latin1_decode(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

pub fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}
