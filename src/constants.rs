//! IEC 62056-21 Protocol Constants
//!
//! This module defines the control characters, literals and lookup tables used
//! by the mode C implementation, based on IEC 62056-21:2002.

use crate::error::Iec62056Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Start of header, leads command frames (and password challenges)
pub const SOH: u8 = 0x01;

/// Start of text
pub const STX: u8 = 0x02;

/// End of text, terminates a complete data block
pub const ETX: u8 = 0x03;

/// End of transmission, terminates a partial block
pub const EOT: u8 = 0x04;

/// Positive acknowledgement
pub const ACK: u8 = 0x06;

/// Negative acknowledgement
pub const NAK: u8 = 0x15;

pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';
pub const LINE_END: &[u8] = b"\r\n";

/// Start character of request and identification frames
pub const START_CHAR: u8 = b'/';
/// Request command character following the start character
pub const REQUEST_COMMAND: u8 = b'?';
/// End character of the request frame
pub const END_CHAR: u8 = b'!';

/// Normal protocol control character sent in the option-select acknowledgement
pub const PROTOCOL_CONTROL_NORMAL: u8 = b'0';

/// Baud rate every mode C session starts at
pub const INITIAL_BAUDRATE: u32 = 300;

/// Password used when none is configured
pub const DEFAULT_PASSWORD: &str = "00000000";

/// Additional data sent with a single-value read request
pub const DEFAULT_READ_ADDITIONAL_DATA: &str = "1";

// ----------------------------------------------------------------------------
// Timing
// ----------------------------------------------------------------------------

/// Minimum reaction time for devices announcing a lowercase manufacturer suffix
pub const SHORT_REACTION_TIME: Duration = Duration::from_millis(20);

/// Minimum reaction time for all other devices
pub const REACTION_TIME: Duration = Duration::from_millis(200);

/// Number of NUL characters in the battery wake-up train
pub const WAKE_UP_CHAR_COUNT: usize = 11;

/// Pause after every wake-up NUL character
pub const WAKE_UP_CHAR_INTERVAL: Duration = Duration::from_millis(200);

/// Settle time between the wake-up train and the request message
pub const WAKE_UP_SETTLE_TIME: Duration = Duration::from_millis(1500);

/// Mode C switchover baud rates, keyed by the character the meter announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaudRate {
    Baud300,
    Baud600,
    Baud1200,
    Baud2400,
    Baud4800,
    Baud9600,
    Baud19200,
}

impl BaudRate {
    /// All mode C rates in code order ('0'..='6').
    pub const ALL_RATES: [BaudRate; 7] = [
        BaudRate::Baud300,
        BaudRate::Baud600,
        BaudRate::Baud1200,
        BaudRate::Baud2400,
        BaudRate::Baud4800,
        BaudRate::Baud9600,
        BaudRate::Baud19200,
    ];

    /// Looks up the rate for a switchover character. Characters outside
    /// '0'..='6' are a lookup error, never a default.
    pub fn from_char(c: char) -> Result<Self, Iec62056Error> {
        match c {
            '0' => Ok(BaudRate::Baud300),
            '1' => Ok(BaudRate::Baud600),
            '2' => Ok(BaudRate::Baud1200),
            '3' => Ok(BaudRate::Baud2400),
            '4' => Ok(BaudRate::Baud4800),
            '5' => Ok(BaudRate::Baud9600),
            '6' => Ok(BaudRate::Baud19200),
            other => Err(Iec62056Error::UnknownBaudrate(other)),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            BaudRate::Baud300 => '0',
            BaudRate::Baud600 => '1',
            BaudRate::Baud1200 => '2',
            BaudRate::Baud2400 => '3',
            BaudRate::Baud4800 => '4',
            BaudRate::Baud9600 => '5',
            BaudRate::Baud19200 => '6',
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::Baud300 => 300,
            BaudRate::Baud600 => 600,
            BaudRate::Baud1200 => 1200,
            BaudRate::Baud2400 => 2400,
            BaudRate::Baud4800 => 4800,
            BaudRate::Baud9600 => 9600,
            BaudRate::Baud19200 => 19200,
        }
    }
}

/// Mode requested in the option-select acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Readout,
    Programming,
    Binary,
    Manufacturer6,
    Manufacturer7,
    Manufacturer8,
    Manufacturer9,
}

impl Mode {
    pub const ALL_MODES: [Mode; 7] = [
        Mode::Readout,
        Mode::Programming,
        Mode::Binary,
        Mode::Manufacturer6,
        Mode::Manufacturer7,
        Mode::Manufacturer8,
        Mode::Manufacturer9,
    ];

    /// Mode control character sent on the wire.
    pub fn control_char(self) -> char {
        match self {
            Mode::Readout => '0',
            Mode::Programming => '1',
            Mode::Binary => '2',
            Mode::Manufacturer6 => '6',
            Mode::Manufacturer7 => '7',
            Mode::Manufacturer8 => '8',
            Mode::Manufacturer9 => '9',
        }
    }

    pub fn from_control_char(c: char) -> Option<Self> {
        Mode::ALL_MODES.into_iter().find(|m| m.control_char() == c)
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Readout => "readout",
            Mode::Programming => "programming",
            Mode::Binary => "binary",
            Mode::Manufacturer6 => "manufacturer6",
            Mode::Manufacturer7 => "manufacturer7",
            Mode::Manufacturer8 => "manufacturer8",
            Mode::Manufacturer9 => "manufacturer9",
        }
    }
}

impl FromStr for Mode {
    type Err = Iec62056Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL_MODES
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Iec62056Error::UnknownMode(s.to_string()))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_codes_map_to_mode_c_rates() {
        let rates: Vec<u32> = ('0'..='6')
            .map(|c| BaudRate::from_char(c).unwrap().as_u32())
            .collect();
        assert_eq!(rates, vec![300, 600, 1200, 2400, 4800, 9600, 19200]);
    }

    #[test]
    fn test_unknown_baud_code_is_error() {
        for c in ['7', '9', 'A', ' '] {
            assert!(matches!(
                BaudRate::from_char(c),
                Err(Iec62056Error::UnknownBaudrate(x)) if x == c
            ));
        }
    }

    #[test]
    fn test_baud_char_roundtrip() {
        for rate in BaudRate::ALL_RATES {
            assert_eq!(BaudRate::from_char(rate.as_char()).unwrap(), rate);
        }
    }

    #[test]
    fn test_mode_names_and_chars() {
        assert_eq!("readout".parse::<Mode>().unwrap().control_char(), '0');
        assert_eq!("programming".parse::<Mode>().unwrap().control_char(), '1');
        assert_eq!("binary".parse::<Mode>().unwrap().control_char(), '2');
        assert_eq!("manufacturer9".parse::<Mode>().unwrap().control_char(), '9');
        assert_eq!(Mode::from_control_char('7'), Some(Mode::Manufacturer7));
        assert_eq!(Mode::from_control_char('3'), None);
    }

    #[test]
    fn test_unknown_mode_is_configuration_error() {
        let err = "turbo".parse::<Mode>().unwrap_err();
        assert!(err.is_configuration());
    }
}
