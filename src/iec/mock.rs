//! Scripted doubles for driving the session engine without a meter.
//!
//! [`ScriptedTransport`] replays queued responses and records everything the
//! client sends. [`RecordingDelay`] records waits instead of sleeping and
//! [`RecordingSink`] collects session events.

use crate::error::{Iec62056Error, Result};
use crate::iec::timing::Delay;
use crate::iec::transport::Transport;
use crate::logging::{EventSink, SessionEvent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Delay that records requested durations and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn wait(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

/// Sink that keeps every emitted event.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// In-memory transport with scripted answers.
///
/// Each read kind has its own queue; reading from an empty queue is a
/// `Timeout`, the same thing a silent meter produces.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    requires_address: bool,
    connected: bool,
    connects: usize,
    disconnects: usize,
    frames: VecDeque<Vec<u8>>,
    lines: VecDeque<Vec<u8>>,
    bytes: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    baud_switches: Vec<u32>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that, like a TCP gateway, needs a device address.
    pub fn addressed() -> Self {
        ScriptedTransport {
            requires_address: true,
            ..Self::default()
        }
    }

    /// Queues a framed message for [`Transport::read`].
    pub fn push_frame(&mut self, frame: impl Into<Vec<u8>>) -> &mut Self {
        self.frames.push_back(frame.into());
        self
    }

    /// Queues a line for [`Transport::simple_read`].
    pub fn push_line(&mut self, line: impl Into<Vec<u8>>) -> &mut Self {
        self.lines.push_back(line.into());
        self
    }

    /// Queues raw bytes for [`Transport::recv`].
    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend(bytes);
        self
    }

    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn baud_switches(&self) -> &[u32] {
        &self.baud_switches
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn connect_count(&self) -> usize {
        self.connects
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects
    }

    fn silent(operation: &str) -> Iec62056Error {
        Iec62056Error::Timeout {
            operation: operation.to_string(),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn requires_address(&self) -> bool {
        self.requires_address
    }

    fn description(&self) -> String {
        "scripted".to_string()
    }

    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        self.connects += 1;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        self.disconnects += 1;
        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    async fn recv(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.bytes.len() < n {
            return Err(Self::silent("recv"));
        }
        Ok(self.bytes.drain(..n).collect())
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        self.frames.pop_front().ok_or_else(|| Self::silent("read"))
    }

    async fn simple_read(&mut self, _start: u8, _end: u8) -> Result<Vec<u8>> {
        self.lines
            .pop_front()
            .ok_or_else(|| Self::silent("simple_read"))
    }

    async fn switch_baudrate(&mut self, baud: u32) -> Result<()> {
        self.baud_switches.push(baud);
        Ok(())
    }
}
