//! TCP transport for meters behind a serial-to-Ethernet gateway.
//!
//! A gateway usually serves a bus of meters, so requests must carry a device
//! address. The link has no baud rate of its own; the gateway handles the
//! switchover.

use crate::error::{Iec62056Error, Result};
use crate::iec::link::Link;
use crate::iec::transport::Transport;
use async_trait::async_trait;
use log::{debug, info};
use std::time::Duration;
use tokio::net::TcpStream;

pub struct TcpTransport {
    address: String,
    connect_timeout: Duration,
    link: Link<TcpStream>,
}

impl TcpTransport {
    /// `timeout` bounds the connect and every wait for the next received byte.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        TcpTransport {
            address: address.into(),
            connect_timeout: timeout,
            link: Link::new(timeout),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn requires_address(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        format!("tcp {}", self.address)
    }

    async fn connect(&mut self) -> Result<()> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| Iec62056Error::Timeout {
                operation: format!("connect {}", self.address),
            })??;
        stream.set_nodelay(true)?;
        self.link.attach(stream);
        info!("Connected to {}", self.address);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.link.detach().is_some() {
            info!("Disconnected from {}", self.address);
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
        debug!("Ignoring switch to {baud} Bd on {}", self.address);
        Ok(())
    }
}
