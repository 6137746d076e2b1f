//! # Mode C Session Engine
//!
//! Drives one IEC 62056-21 mode C session over a [`Transport`]:
//!
//! ```text
//! Idle --request--> Started --identification--> Identified
//!      --ack/option select--> OptionSelected --read/write--> Exchanging
//!      --break--> Ended
//! ```
//!
//! Exchanges are strictly half-duplex and run in order. The engine rests for
//! the meter's reaction time after the request and after option select, and
//! switches the transport to the baud rate the meter proposed.
//!
//! No step is retried. After any error the caller should disconnect and build
//! a new client; the meter may still be waiting in the middle of a handshake.
//!
//! ## Example
//!
//! ```no_run
//! use iec62056_rs::iec::client::{ClientConfig, Iec6205621Client};
//!
//! # async fn run() -> iec62056_rs::error::Result<()> {
//! let mut client = Iec6205621Client::with_serial_transport("/dev/ttyUSB0", ClientConfig::default())?;
//! client.connect().await?;
//! let answer = client.standard_readout().await?;
//! for data_set in &answer.data {
//!     println!("{data_set}");
//! }
//! client.end_session().await?;
//! # Ok(())
//! # }
//! ```

use crate::constants::{
    BaudRate, Mode, ACK, DEFAULT_PASSWORD, DEFAULT_READ_ADDITIONAL_DATA, INITIAL_BAUDRATE, LF,
    NAK, START_CHAR, WAKE_UP_CHAR_COUNT, WAKE_UP_CHAR_INTERVAL, WAKE_UP_SETTLE_TIME,
};
use crate::error::{Iec62056Error, Result};
use crate::iec::message::{
    AckOptionSelectMessage, AnswerDataMessage, CommandMessage, DataSet, IdentificationMessage,
    RequestMessage, Response, WireMessage,
};
use crate::iec::serial::{SerialConfig, SerialTransport};
use crate::iec::tcp::TcpTransport;
use crate::iec::timing::{Delay, ReactionTimer, TokioDelay};
use crate::iec::transport::Transport;
use crate::logging::{EventSink, LogSink, SessionEvent};
use crate::payload::profile::{arrange, ProfileData, ProfileLayout};
use crate::vendors::manufacturer::manufacturer_name;
use crate::vendors::{ClassifierKind, ErrorClassifier};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Handshake progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    Idle,
    Started,
    Identified,
    OptionSelected,
    Exchanging,
    Ended,
}

/// Per-meter client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Empty for point-to-point links such as an optical probe.
    pub device_address: String,
    pub password: String,
    /// Send the NUL wake-up sequence before every request.
    pub battery_powered: bool,
    pub classifier: ClassifierKind,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            device_address: String::new(),
            password: DEFAULT_PASSWORD.to_string(),
            battery_powered: false,
            classifier: ClassifierKind::Noop,
        }
    }
}

impl ClientConfig {
    /// Loads a configuration from a JSON file. Missing fields take their
    /// defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Iec62056Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Iec62056Error::Config(e.to_string()))
    }
}

/// Assembles a client from a transport and its collaborators.
pub struct ClientBuilder<T: Transport> {
    transport: T,
    config: ClientConfig,
    classifier: Option<Arc<dyn ErrorClassifier>>,
    delay: Arc<dyn Delay>,
    sink: Arc<dyn EventSink>,
}

impl<T: Transport> ClientBuilder<T> {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn device_address(mut self, address: impl Into<String>) -> Self {
        self.config.device_address = address.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn battery_powered(mut self, battery_powered: bool) -> Self {
        self.config.battery_powered = battery_powered;
        self
    }

    pub fn classifier(mut self, kind: ClassifierKind) -> Self {
        self.config.classifier = kind;
        self.classifier = None;
        self
    }

    /// Uses a classifier outside the [`ClassifierKind`] registry.
    pub fn custom_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> Result<Iec6205621Client<T>> {
        if self.transport.requires_address() && self.config.device_address.is_empty() {
            return Err(Iec62056Error::MissingDeviceAddress {
                transport: self.transport.description(),
            });
        }

        let classifier = self
            .classifier
            .unwrap_or_else(|| self.config.classifier.build());

        Ok(Iec6205621Client {
            transport: self.transport,
            config: self.config,
            classifier,
            timer: ReactionTimer::new(self.delay),
            sink: self.sink,
            identification: None,
            current_baudrate: INITIAL_BAUDRATE,
            state: SessionState::Idle,
        })
    }
}

/// IEC 62056-21 mode C client.
pub struct Iec6205621Client<T: Transport> {
    transport: T,
    config: ClientConfig,
    classifier: Arc<dyn ErrorClassifier>,
    timer: ReactionTimer,
    sink: Arc<dyn EventSink>,
    identification: Option<IdentificationMessage>,
    current_baudrate: u32,
    state: SessionState,
}

impl Iec6205621Client<SerialTransport> {
    /// Client over a local serial port (optical probe), 300 Bd 7E1.
    pub fn with_serial_transport(port: &str, config: ClientConfig) -> Result<Self> {
        Iec6205621Client::builder(SerialTransport::with_config(port, SerialConfig::default()))
            .config(config)
            .build()
    }
}

impl Iec6205621Client<TcpTransport> {
    /// Client over a TCP gateway; `config.device_address` must be set.
    pub fn with_tcp_transport(address: &str, config: ClientConfig) -> Result<Self> {
        Iec6205621Client::builder(TcpTransport::new(address, Duration::from_secs(5)))
            .config(config)
            .build()
    }
}

impl<T: Transport> Iec6205621Client<T> {
    pub fn builder(transport: T) -> ClientBuilder<T> {
        ClientBuilder {
            transport,
            config: ClientConfig::default(),
            classifier: None,
            delay: Arc::new(TokioDelay),
            sink: Arc::new(LogSink),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identification(&self) -> Option<&IdentificationMessage> {
        self.identification.as_ref()
    }

    pub fn manufacturer_id(&self) -> Option<&str> {
        self.identification.as_ref().map(|i| i.manufacturer.as_str())
    }

    /// Baud rate proposed by the meter, once identified.
    pub fn switchover_baudrate(&self) -> Option<u32> {
        self.identification
            .as_ref()
            .and_then(|i| BaudRate::from_char(i.switchover_baudrate_char).ok())
            .map(BaudRate::as_u32)
    }

    pub fn current_baudrate(&self) -> u32 {
        self.current_baudrate
    }

    pub fn uses_short_reaction_time(&self) -> bool {
        self.timer.uses_short_reaction_time()
    }

    pub fn reaction_time(&self) -> Duration {
        self.timer.reaction_time()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Gives the transport back, e.g. to reuse it for the next session.
    pub fn into_transport(self) -> T {
        self.transport
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Ended {
            return Err(Iec62056Error::SessionClosed);
        }
        Ok(())
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            self.sink.emit(&SessionEvent::StateTransition {
                from: self.state,
                to,
            });
            self.state = to;
        }
    }

    async fn send(&mut self, operation: &'static str, bytes: Vec<u8>) -> Result<()> {
        self.transport.send(&bytes).await?;
        self.sink
            .emit(&SessionEvent::RequestSent { operation, bytes });
        Ok(())
    }

    /// Waits `duration`, or the default rest for the current reaction time.
    pub async fn rest(&self, duration: Option<Duration>) {
        let duration = self.timer.rest(duration).await;
        self.sink.emit(&SessionEvent::Rested { duration });
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    pub async fn connect(&mut self) -> Result<()> {
        self.ensure_open()?;
        info!("Connecting {}", self.transport.description());
        self.transport.connect().await
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect().await
    }

    // ------------------------------------------------------------------
    // Handshake
    // ------------------------------------------------------------------

    /// Wakes the meter if needed, sends the request and reads the
    /// identification.
    pub async fn startup(&mut self) -> Result<IdentificationMessage> {
        self.ensure_open()?;
        if self.config.battery_powered {
            self.send_battery_power_startup_sequence().await?;
        }
        info!("Starting init sequence");
        self.send_init_request().await?;
        self.read_identification().await
    }

    /// NUL characters for about 2.2 s, then 1.5 s of silence before the
    /// request.
    pub async fn send_battery_power_startup_sequence(&mut self) -> Result<()> {
        self.ensure_open()?;
        info!("Sending battery startup sequence");
        for _ in 0..WAKE_UP_CHAR_COUNT {
            self.send("wake_up", vec![0x00]).await?;
            self.rest(Some(WAKE_UP_CHAR_INTERVAL)).await;
        }
        info!("Startup sequence finished");
        self.rest(Some(WAKE_UP_SETTLE_TIME)).await;
        Ok(())
    }

    /// Sends `/?{device_address}!` and rests.
    pub async fn send_init_request(&mut self) -> Result<()> {
        self.ensure_open()?;
        let request = RequestMessage::new(self.config.device_address.clone());
        self.send("request", request.to_bytes()?).await?;
        self.transition(SessionState::Started);
        self.rest(None).await;
        Ok(())
    }

    /// Reads and records the identification line.
    pub async fn read_identification(&mut self) -> Result<IdentificationMessage> {
        self.ensure_open()?;
        let data = self.transport.simple_read(START_CHAR, LF).await?;
        self.sink.emit(&SessionEvent::FrameReceived {
            bytes: data.clone(),
        });
        let identification = IdentificationMessage::from_bytes(&data)?;

        info!(
            "Received identification {identification} ({})",
            manufacturer_name(&identification.manufacturer).unwrap_or("unknown manufacturer")
        );
        self.timer
            .select_for_manufacturer(&identification.manufacturer);
        self.identification = Some(identification.clone());
        self.transition(SessionState::Identified);
        Ok(identification)
    }

    /// Acknowledges the identification, selecting `mode` at the proposed baud
    /// rate, then switches the transport to it.
    pub async fn ack_with_option_select(&mut self, mode: Mode) -> Result<()> {
        self.ensure_open()?;
        let baud_char = self
            .identification
            .as_ref()
            .map(|i| i.switchover_baudrate_char)
            .ok_or(Iec62056Error::NotIdentified)?;
        let baud = BaudRate::from_char(baud_char)?;

        let ack = AckOptionSelectMessage::new(mode, baud_char);
        info!("Sending option select: {ack} ({mode})");
        self.send("option_select", ack.to_bytes()?).await?;
        self.rest(None).await;

        self.transport.switch_baudrate(baud.as_u32()).await?;
        self.current_baudrate = baud.as_u32();
        self.transition(SessionState::OptionSelected);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Exchanges
    // ------------------------------------------------------------------

    /// Mode 0 readout of every register the meter publishes.
    pub async fn standard_readout(&mut self) -> Result<AnswerDataMessage> {
        self.startup().await?;
        self.ack_with_option_select(Mode::Readout).await?;
        info!("Reading standard readout from device");
        let answer = self.read_response().await?.into_answer()?;
        self.transition(SessionState::Exchanging);
        Ok(answer)
    }

    /// Enters programming mode and returns the meter's password challenge.
    pub async fn access_programming_mode(&mut self) -> Result<CommandMessage> {
        self.startup().await?;
        self.ack_with_option_select(Mode::Programming).await?;
        let challenge = self.read_response().await?.into_command()?;
        debug!("Password challenge: {challenge}");
        self.transition(SessionState::Exchanging);
        Ok(challenge)
    }

    /// Reads the load profile for the inclusive date range.
    pub async fn read_profile(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ProfileData>> {
        if start > end {
            return Err(Iec62056Error::InvalidDateRange);
        }
        self.startup().await?;
        let manufacturer = self.manufacturer_id().unwrap_or_default().to_string();
        let layout = ProfileLayout::for_manufacturer(&manufacturer)?;

        self.ack_with_option_select(Mode::Programming).await?;
        // password challenge, only checked for framing and BCC
        self.read_response().await?;
        self.transition(SessionState::Exchanging);

        let request = layout.request(start, end);
        info!("Sending profile request for {start}..{end}: {request}");
        self.send("profile_request", request.to_bytes()?).await?;

        let answer = self.read_response().await?.into_answer()?;
        arrange(&manufacturer, &answer.data)
    }

    /// Answers a password challenge with `P1`, using the configured password
    /// when `password` is `None`.
    pub async fn send_password(&mut self, password: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let password = password.unwrap_or(&self.config.password).to_string();
        info!("Sending password to meter");
        self.send("password", CommandMessage::for_password(&password).to_bytes()?)
            .await
    }

    /// Sends the password like [`send_password`](Self::send_password) and
    /// waits for the meter to accept it with ACK.
    pub async fn authenticate(&mut self, password: Option<&str>) -> Result<()> {
        self.send_password(password).await?;

        let reply = self.transport.recv(1).await?;
        match reply.first().copied() {
            Some(ACK) => {
                info!("Password accepted");
                Ok(())
            }
            Some(NAK) => {
                warn!("Password rejected");
                Err(Iec62056Error::PasswordRejected)
            }
            other => Err(Iec62056Error::UnexpectedResponse {
                byte: other.unwrap_or_default(),
                request: "P1".to_string(),
            }),
        }
    }

    pub async fn send_break(&mut self) -> Result<()> {
        self.ensure_open()?;
        info!("Sending BREAK message to end communication");
        self.send("break", CommandMessage::break_message().to_bytes()?)
            .await
    }

    /// Signs off with a break and disconnects. The client is unusable
    /// afterwards.
    pub async fn end_session(&mut self) -> Result<()> {
        self.send_break().await?;
        self.transport.disconnect().await?;
        self.transition(SessionState::Ended);
        Ok(())
    }

    /// Reads one framed message. SOH-led frames are commands (usually a
    /// password challenge); answers go through the error classifier.
    pub async fn read_response(&mut self) -> Result<Response> {
        self.ensure_open()?;
        let data = self.transport.read().await?;
        self.sink.emit(&SessionEvent::FrameReceived {
            bytes: data.clone(),
        });

        let response = match Response::from_bytes(&data) {
            Ok(response) => response,
            Err(Iec62056Error::Checksum {
                expected,
                calculated,
                raw,
            }) => {
                self.sink.emit(&SessionEvent::ChecksumFailure {
                    expected,
                    calculated,
                    bytes: raw.clone(),
                });
                return Err(Iec62056Error::Checksum {
                    expected,
                    calculated,
                    raw,
                });
            }
            Err(e) => return Err(e),
        };

        if let Response::Answer(answer) = &response {
            self.classifier.check_for_errors(answer)?;
        }
        Ok(response)
    }

    /// Reads one register in programming mode. `additional_data` defaults to
    /// `"1"`, which some meters require.
    pub async fn read_single_value(
        &mut self,
        address: &str,
        additional_data: Option<&str>,
    ) -> Result<DataSet> {
        self.ensure_open()?;
        let request = CommandMessage::for_single_read(
            address,
            additional_data.unwrap_or(DEFAULT_READ_ADDITIONAL_DATA),
        );
        info!("Sending read request: {request}");
        self.send("read", request.to_bytes()?).await?;

        let mut answer = self.read_response().await?.into_answer()?;
        match answer.data.len() {
            0 => Err(Iec62056Error::NoDataReturned),
            1 => {
                let data_set = answer.data.remove(0);
                info!("Received response: {data_set}");
                Ok(data_set)
            }
            n => Err(Iec62056Error::TooManyValuesReturned(n)),
        }
    }

    /// Writes one register; the meter must answer with ACK.
    pub async fn write_single_value(&mut self, address: &str, value: &str) -> Result<()> {
        self.ensure_open()?;
        let request = CommandMessage::for_single_write(address, value);
        info!("Sending write request: {request}");
        self.send("write", request.to_bytes()?).await?;

        let reply = self.transport.recv(1).await?;
        match reply.first().copied() {
            Some(ACK) => {
                info!("Write request accepted");
                Ok(())
            }
            Some(NAK) => {
                warn!("Write request rejected");
                Err(Iec62056Error::WriteRejected {
                    request: request.to_string(),
                })
            }
            other => Err(Iec62056Error::UnexpectedResponse {
                byte: other.unwrap_or_default(),
                request: request.to_string(),
            }),
        }
    }
}
