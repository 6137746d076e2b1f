//! # IEC 62056-21 Message Codec
//!
//! This module encodes and decodes every message kind exchanged in a mode C
//! session. Each kind implements [`WireMessage`], a pure `to_bytes` /
//! `from_bytes` pair; the data-set grammar inside blocks is parsed with `nom`.
//!
//! ## Frames
//!
//! ```text
//! Request           /?{address}!<CR><LF>
//! Identification    /{MMM}{Z}{identification}<CR><LF>
//! Ack/option select <ACK>0{Z}{Y}<CR><LF>
//! Command           <SOH>{C}{D}<STX>{data set}<ETX>{BCC}   or   <SOH>{C}{D}<ETX>{BCC}
//! Answer            <STX>{data set}<CR><LF>...<ETX>{BCC}
//! ```
//!
//! ## Error Handling
//!
//! Encoders refuse messages that would not decode back to themselves: text
//! outside latin-1, control characters, and the data-set delimiters `(`, `)`
//! and `*` inside addresses, values and units are reported as
//! [`Iec62056Error::InvalidMessage`]. Decoders check framing first (start/end markers and grammar) and report
//! [`Iec62056Error::Framing`]; a frame that is well-formed but whose BCC does
//! not validate is reported as [`Iec62056Error::Checksum`]. No data set of a
//! frame is returned before its BCC validates.

use crate::constants::{
    Mode, ACK, CR, END_CHAR, ETX, LF, LINE_END, PROTOCOL_CONTROL_NORMAL, REQUEST_COMMAND, SOH,
    START_CHAR, STX,
};
use crate::error::{Iec62056Error, Result};
use crate::iec::bcc::{calculate_bcc, verify_bcc};
use crate::util::hex::format_frame;
use crate::util::text::{latin1_decode, latin1_encode};
use nom::{
    bytes::complete::{take_till, take_while},
    character::complete::char,
    combinator::opt,
    multi::many0,
    sequence::{pair, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoding and decoding of one message kind.
pub trait WireMessage: Sized {
    fn to_bytes(&self) -> Result<Vec<u8>>;
    fn from_bytes(data: &[u8]) -> Result<Self>;
}

/// Characters that delimit the parts of a data set.
const DATA_SET_DELIMITERS: &[char] = &['(', ')', '*'];

/// Fails if `text` holds a character outside latin-1, a control character,
/// or one of `reserved`.
fn check_text(field: &str, text: &str, reserved: &[char]) -> Result<()> {
    match text
        .chars()
        .find(|c| u32::from(*c) > 0xFF || c.is_control() || reserved.contains(c))
    {
        Some(c) => Err(Iec62056Error::InvalidMessage(format!(
            "{field} {text:?} contains {c:?}"
        ))),
        None => Ok(()),
    }
}

/// Appends the BCC computed from `start` to the end of `frame`.
fn push_bcc(mut frame: Vec<u8>, start: usize) -> Vec<u8> {
    let bcc = calculate_bcc(&frame[start..]);
    frame.push(bcc);
    frame
}

// ----------------------------------------------------------------------------
// Data sets
// ----------------------------------------------------------------------------

/// Addressed value unit carried by command and answer blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSet {
    pub address: Option<String>,
    pub value: String,
    pub unit: Option<String>,
    /// Written after the data set inside a command frame. It is an encode-time
    /// override only; decoders leave it `None` unless trailing text follows.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end: Option<String>,
}

impl DataSet {
    pub fn new(value: impl Into<String>) -> Self {
        DataSet {
            address: None,
            value: value.into(),
            unit: None,
            end: None,
        }
    }

    /// An empty address is the same as none.
    pub fn with_address(address: impl Into<String>, value: impl Into<String>) -> Self {
        let address: String = address.into();
        DataSet {
            address: (!address.is_empty()).then_some(address),
            ..DataSet::new(value)
        }
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// An empty suffix is the same as none.
    pub fn end(mut self, end: impl Into<String>) -> Self {
        let end: String = end.into();
        self.end = (!end.is_empty()).then_some(end);
        self
    }

    /// Checks that the data set encodes to text that parses back to it.
    pub fn validate(&self) -> Result<()> {
        if let Some(address) = &self.address {
            if address.is_empty() {
                return Err(Iec62056Error::InvalidMessage(
                    "empty data set address, use None".into(),
                ));
            }
            check_text("address", address, DATA_SET_DELIMITERS)?;
        }
        check_text("value", &self.value, DATA_SET_DELIMITERS)?;
        if let Some(unit) = &self.unit {
            check_text("unit", unit, DATA_SET_DELIMITERS)?;
        }
        if let Some(end) = &self.end {
            if end.is_empty() {
                return Err(Iec62056Error::InvalidMessage(
                    "empty data set end, use None".into(),
                ));
            }
            check_text("data set end", end, &[])?;
        }
        Ok(())
    }

    /// `address(value*unit)`, `address(value)` or `(value)`.
    pub fn to_representation(&self) -> String {
        let body = match &self.unit {
            Some(unit) => format!("{}*{}", self.value, unit),
            None => self.value.clone(),
        };
        match &self.address {
            Some(address) => format!("{address}({body})"),
            None => format!("({body})"),
        }
    }

    /// Parses exactly one data set; trailing text is an error.
    pub fn from_representation(text: &str) -> Result<Self> {
        match parse_data_set(text) {
            Ok(("", data_set)) => Ok(data_set),
            _ => Err(Iec62056Error::framing(
                "malformed data set",
                &latin1_encode(text),
            )),
        }
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_representation())
    }
}

fn parse_data_set(input: &str) -> IResult<&str, DataSet> {
    let (input, address) = take_till(|c: char| matches!(c, '(' | ')' | '\r' | '\n'))(input)?;
    let (input, _) = char('(')(input)?;
    let (input, content) = take_till(|c: char| c == ')')(input)?;
    let (input, _) = char(')')(input)?;

    let (value, unit) = match content.split_once('*') {
        Some((value, unit)) => (value, Some(unit.to_string())),
        None => (content, None),
    };
    Ok((
        input,
        DataSet {
            address: (!address.is_empty()).then(|| address.to_string()),
            value: value.to_string(),
            unit,
            end: None,
        },
    ))
}

fn line_ends(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c == '\r' || c == '\n')(input)
}

/// Data sets of an answer block, optionally closed by the `!` end marker.
fn parse_answer_body(input: &str) -> IResult<&str, Vec<DataSet>> {
    let (input, data) = many0(preceded(line_ends, parse_data_set))(input)?;
    let (input, _) = line_ends(input)?;
    let (input, _) = opt(pair(char('!'), line_ends))(input)?;
    Ok((input, data))
}

// ----------------------------------------------------------------------------
// Request
// ----------------------------------------------------------------------------

/// Session start frame, `/?{device_address}!<CR><LF>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestMessage {
    pub device_address: String,
}

impl RequestMessage {
    pub fn new(device_address: impl Into<String>) -> Self {
        RequestMessage {
            device_address: device_address.into(),
        }
    }
}

impl WireMessage for RequestMessage {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        check_text("device address", &self.device_address, &[])?;
        let mut out = vec![START_CHAR, REQUEST_COMMAND];
        out.extend(latin1_encode(&self.device_address));
        out.push(END_CHAR);
        out.extend_from_slice(LINE_END);
        Ok(out)
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        let inner = data
            .strip_prefix(&[START_CHAR, REQUEST_COMMAND])
            .and_then(|d| d.strip_suffix(b"!\r\n"))
            .ok_or_else(|| Iec62056Error::framing("request must be /?...!<CR><LF>", data))?;
        Ok(RequestMessage::new(latin1_decode(inner)))
    }
}

// ----------------------------------------------------------------------------
// Identification
// ----------------------------------------------------------------------------

/// Identification frame sent by the meter in answer to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationMessage {
    pub identification: String,
    /// Three-letter FLAG code; a lowercase last letter announces a 20 ms
    /// reaction time.
    pub manufacturer: String,
    pub switchover_baudrate_char: char,
}

impl IdentificationMessage {
    pub fn new(
        manufacturer: impl Into<String>,
        switchover_baudrate_char: char,
        identification: impl Into<String>,
    ) -> Self {
        IdentificationMessage {
            identification: identification.into(),
            manufacturer: manufacturer.into(),
            switchover_baudrate_char,
        }
    }
}

impl WireMessage for IdentificationMessage {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.manufacturer.len() != 3
            || !self.manufacturer.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(Iec62056Error::InvalidMessage(format!(
                "manufacturer {:?} is not three letters",
                self.manufacturer
            )));
        }
        let baud_char = self.switchover_baudrate_char.to_string();
        check_text("baud rate character", &baud_char, &[])?;
        check_text("identification", &self.identification, &[])?;

        let mut out = vec![START_CHAR];
        out.extend(latin1_encode(&self.manufacturer));
        out.extend(latin1_encode(&baud_char));
        out.extend(latin1_encode(&self.identification));
        out.extend_from_slice(LINE_END);
        Ok(out)
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        let inner = data
            .strip_prefix(&[START_CHAR])
            .and_then(|d| d.strip_suffix(&[LF]))
            .ok_or_else(|| {
                Iec62056Error::framing("identification must be /...<LF>", data)
            })?;
        let inner = inner.strip_suffix(&[CR]).unwrap_or(inner);

        let text = latin1_decode(inner);
        let mut chars = text.chars();
        let manufacturer: String = chars.by_ref().take(3).collect();
        if manufacturer.chars().count() != 3
            || !manufacturer.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(Iec62056Error::framing(
                "manufacturer code must be three letters",
                data,
            ));
        }
        let switchover_baudrate_char = chars
            .next()
            .ok_or_else(|| Iec62056Error::framing("missing baud rate character", data))?;

        Ok(IdentificationMessage {
            identification: chars.collect(),
            manufacturer,
            switchover_baudrate_char,
        })
    }
}

impl fmt::Display for IdentificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (manufacturer {}, baud char {})",
            self.identification, self.manufacturer, self.switchover_baudrate_char
        )
    }
}

// ----------------------------------------------------------------------------
// Option select
// ----------------------------------------------------------------------------

/// Client acknowledgement selecting the mode and confirming the baud rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckOptionSelectMessage {
    pub mode: Mode,
    pub baud_char: char,
}

impl AckOptionSelectMessage {
    pub fn new(mode: Mode, baud_char: char) -> Self {
        AckOptionSelectMessage { mode, baud_char }
    }

    pub fn mode_char(&self) -> char {
        self.mode.control_char()
    }
}

impl WireMessage for AckOptionSelectMessage {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let baud = u8::try_from(u32::from(self.baud_char)).map_err(|_| {
            Iec62056Error::InvalidMessage(format!(
                "baud rate character {:?} is not one byte",
                self.baud_char
            ))
        })?;
        let mut out = vec![ACK, PROTOCOL_CONTROL_NORMAL, baud];
        out.extend(latin1_encode(&self.mode_char().to_string()));
        out.extend_from_slice(LINE_END);
        Ok(out)
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        match data {
            [ACK, PROTOCOL_CONTROL_NORMAL, baud, mode, CR, LF] => {
                let mode = Mode::from_control_char(*mode as char).ok_or_else(|| {
                    Iec62056Error::framing("unknown mode control character", data)
                })?;
                Ok(AckOptionSelectMessage::new(mode, *baud as char))
            }
            _ => Err(Iec62056Error::framing(
                "option select must be <ACK>0ZY<CR><LF>",
                data,
            )),
        }
    }
}

impl fmt::Display for AckOptionSelectMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bytes() {
            Ok(bytes) => f.write_str(&format_frame(&bytes)),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// Command message identifier (`C` in the standard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    Password,
    Write,
    Read,
    Execute,
    Break,
}

impl Command {
    pub fn as_char(self) -> char {
        match self {
            Command::Password => 'P',
            Command::Write => 'W',
            Command::Read => 'R',
            Command::Execute => 'E',
            Command::Break => 'B',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'P' => Some(Command::Password),
            'W' => Some(Command::Write),
            'R' => Some(Command::Read),
            'E' => Some(Command::Execute),
            'B' => Some(Command::Break),
            _ => None,
        }
    }
}

/// Programming-mode command, also used for the password challenge the meter
/// sends after entering programming mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub command: Command,
    /// Command type identifier (`D`), `'0'..='9'`.
    pub command_type: char,
    pub data_set: Option<DataSet>,
}

impl CommandMessage {
    pub fn new(command: Command, command_type: char, data_set: Option<DataSet>) -> Self {
        CommandMessage {
            command,
            command_type,
            data_set,
        }
    }

    /// `R1` read of one register.
    pub fn for_single_read(address: &str, additional_data: &str) -> Self {
        Self::new(
            Command::Read,
            '1',
            Some(DataSet::with_address(address, additional_data)),
        )
    }

    /// `W1` write of one register.
    pub fn for_single_write(address: &str, value: &str) -> Self {
        Self::new(Command::Write, '1', Some(DataSet::with_address(address, value)))
    }

    /// `P1` password in clear text.
    pub fn for_password(password: &str) -> Self {
        Self::new(Command::Password, '1', Some(DataSet::new(password)))
    }

    /// `B0` complete sign-off.
    pub fn break_message() -> Self {
        Self::new(Command::Break, '0', None)
    }
}

impl WireMessage for CommandMessage {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.command_type.is_ascii_digit() {
            return Err(Iec62056Error::InvalidMessage(format!(
                "command type {:?} is not a digit",
                self.command_type
            )));
        }
        if let Some(data_set) = &self.data_set {
            data_set.validate()?;
        }

        let mut out = vec![SOH];
        out.extend(latin1_encode(&format!(
            "{}{}",
            self.command.as_char(),
            self.command_type
        )));
        if let Some(data_set) = &self.data_set {
            out.push(STX);
            out.extend(latin1_encode(&data_set.to_representation()));
            if let Some(end) = &data_set.end {
                out.extend(latin1_encode(end));
            }
        }
        out.push(ETX);
        Ok(push_bcc(out, 1))
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 5 || data[0] != SOH {
            return Err(Iec62056Error::framing(
                "command frame must start with SOH",
                data,
            ));
        }
        let etx = data.len() - 2;
        if data[etx] != ETX {
            return Err(Iec62056Error::framing("missing ETX before BCC", data));
        }
        verify_bcc(data)?;

        let command = Command::from_char(data[1] as char)
            .ok_or_else(|| Iec62056Error::framing("unknown command identifier", data))?;
        let command_type = data[2] as char;
        if !command_type.is_ascii_digit() {
            return Err(Iec62056Error::framing("command type must be a digit", data));
        }

        let data_set = match data[3] {
            ETX if etx == 3 => None,
            STX => {
                let body = latin1_decode(&data[4..etx]);
                let (rest, mut data_set) = parse_data_set(&body).map_err(|_| {
                    Iec62056Error::framing("malformed data set in command", data)
                })?;
                if !rest.is_empty() {
                    data_set.end = Some(rest.to_string());
                }
                Some(data_set)
            }
            _ => {
                return Err(Iec62056Error::framing(
                    "expected STX or ETX after command header",
                    data,
                ))
            }
        };

        Ok(CommandMessage::new(command, command_type, data_set))
    }
}

impl fmt::Display for CommandMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bytes() {
            Ok(bytes) => f.write_str(&format_frame(&bytes)),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Answers
// ----------------------------------------------------------------------------

/// Data block sent by the meter. Order is significant: profile data is
/// positional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswerDataMessage {
    pub data: Vec<DataSet>,
}

impl AnswerDataMessage {
    pub fn new(data: Vec<DataSet>) -> Self {
        AnswerDataMessage { data }
    }
}

impl WireMessage for AnswerDataMessage {
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = vec![STX];
        for data_set in &self.data {
            data_set.validate()?;
            if data_set.end.is_some() {
                return Err(Iec62056Error::InvalidMessage(
                    "data set end is only written in command frames".into(),
                ));
            }
            out.extend(latin1_encode(&data_set.to_representation()));
            out.extend_from_slice(LINE_END);
        }
        out.push(ETX);
        Ok(push_bcc(out, 1))
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 3 || data[0] != STX {
            return Err(Iec62056Error::framing("answer must start with STX", data));
        }
        let etx = data.len() - 2;
        if data[etx] != ETX {
            return Err(Iec62056Error::framing("missing ETX before BCC", data));
        }
        verify_bcc(data)?;

        let body = latin1_decode(&data[1..etx]);
        match parse_answer_body(&body) {
            Ok(("", sets)) => Ok(AnswerDataMessage::new(sets)),
            Ok((rest, _)) => Err(Iec62056Error::framing(
                format!("unparsed data in answer block: {rest:?}"),
                data,
            )),
            Err(e) => Err(Iec62056Error::framing(
                format!("malformed answer block: {e}"),
                data,
            )),
        }
    }
}

/// One framed message read from the meter during the data exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Answer(AnswerDataMessage),
    Command(CommandMessage),
}

impl Response {
    /// Picks the decoder from the first byte: SOH leads a command (usually a
    /// password challenge), anything else is an answer block.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.first() == Some(&SOH) {
            CommandMessage::from_bytes(data).map(Response::Command)
        } else {
            AnswerDataMessage::from_bytes(data).map(Response::Answer)
        }
    }

    pub fn into_answer(self) -> Result<AnswerDataMessage> {
        match self {
            Response::Answer(answer) => Ok(answer),
            Response::Command(command) => Err(Iec62056Error::framing(
                "expected a data answer, received a command frame",
                &command.to_bytes().unwrap_or_default(),
            )),
        }
    }

    pub fn into_command(self) -> Result<CommandMessage> {
        match self {
            Response::Command(command) => Ok(command),
            Response::Answer(answer) => Err(Iec62056Error::framing(
                "expected a command frame, received a data answer",
                &answer.to_bytes().unwrap_or_default(),
            )),
        }
    }
}
