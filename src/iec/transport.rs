//! Transport capability used by the session engine.
//!
//! Implementations move raw bytes and know where a framed message ends; they
//! contain no protocol logic. See [`crate::iec::serial`] and
//! [`crate::iec::tcp`].

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Transport: Send {
    /// Transports reaching several meters over one link (TCP gateways,
    /// RS-485) need a device address in the request message.
    fn requires_address(&self) -> bool {
        false
    }

    /// Human-readable name for errors and logs.
    fn description(&self) -> String;

    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    /// Writes raw bytes.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Reads exactly `n` bytes.
    async fn recv(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Reads one complete framed message (SOH/STX led, ETX terminated, BCC
    /// included), reassembling partial blocks.
    async fn read(&mut self) -> Result<Vec<u8>>;

    /// Skips input until `start` is seen, then reads through `end` inclusive.
    async fn simple_read(&mut self, start: u8, end: u8) -> Result<Vec<u8>>;

    /// Changes the symbol rate mid-session. Links without a baud rate ignore
    /// this.
    async fn switch_baudrate(&mut self, baud: u32) -> Result<()>;
}
