//! # Serial Transport
//!
//! Mode C over an optical probe or RS-232/RS-485 line. The port is opened at
//! 300 Bd with 7 data bits, even parity and one stop bit, as IEC 62056-21
//! requires for the opening handshake; the session engine switches the rate
//! after option select.

use crate::constants::INITIAL_BAUDRATE;
use crate::error::{Iec62056Error, Result};
use crate::iec::link::Link;
use crate::iec::transport::Transport;
use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

/// Configuration for serial connection.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baudrate: u32,
    /// Longest wait for the next byte of a message.
    pub inter_char_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: INITIAL_BAUDRATE,
            inter_char_timeout: Duration::from_secs(5),
        }
    }
}

pub struct SerialTransport {
    port_name: String,
    config: SerialConfig,
    link: Link<SerialStream>,
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_config(port_name, SerialConfig::default())
    }

    pub fn with_config(port_name: impl Into<String>, config: SerialConfig) -> Self {
        SerialTransport {
            port_name: port_name.into(),
            link: Link::new(config.inter_char_timeout),
            config,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn description(&self) -> String {
        format!("serial {}", self.port_name)
    }

    async fn connect(&mut self) -> Result<()> {
        let port = tokio_serial::new(&self.port_name, self.config.baudrate)
            .data_bits(tokio_serial::DataBits::Seven)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::Even)
            .timeout(self.config.inter_char_timeout)
            .open_native_async()
            .map_err(|e| Iec62056Error::Transport(e.to_string()))?;
        self.link.attach(port);
        info!(
            "Opened {} at {} Bd (7E1)",
            self.port_name, self.config.baudrate
        );
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // dropping the stream closes the port
        if self.link.detach().is_some() {
            info!("Closed {}", self.port_name);
        }
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.link.send(data).await
    }

    async fn recv(&mut self, n: usize) -> Result<Vec<u8>> {
        self.link.recv(n).await
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        self.link.read().await
    }

    async fn simple_read(&mut self, start: u8, end: u8) -> Result<Vec<u8>> {
        self.link.simple_read(start, end).await
    }

    async fn switch_baudrate(&mut self, baud: u32) -> Result<()> {
        debug!("Switching {} to {} Bd", self.port_name, baud);
        self.link
            .stream_mut()?
            .set_baud_rate(baud)
            .map_err(|e| Iec62056Error::Transport(e.to_string()))
    }
}
