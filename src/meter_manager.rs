//! # Meter Manager
//!
//! Bridge-level entry point: each operation runs one complete session against
//! a single meter and returns serializable results.
//!
//! The meter's transport is held behind an async mutex for the whole
//! operation (lock, build a fresh client, connect, run, disconnect, hand the
//! transport back, unlock), so two callers never interleave on one link. A
//! fresh client per operation is what resets the session state.

use crate::error::{Iec62056Error, Result};
use crate::iec::client::{ClientConfig, Iec6205621Client};
use crate::iec::message::{DataSet, IdentificationMessage};
use crate::iec::timing::{Delay, TokioDelay};
use crate::iec::transport::Transport;
use crate::logging::{EventSink, LogSink};
use crate::payload::profile::ProfileData;
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of a standard (mode 0) readout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardData {
    pub identification: Option<IdentificationMessage>,
    pub data: Vec<DataSet>,
}

/// Serializes a bridge result as pretty-printed JSON.
pub fn to_json<V: Serialize>(value: &V) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Exclusive-session access to one meter.
pub struct MeterManager<T: Transport> {
    transport: Mutex<Option<T>>,
    config: ClientConfig,
    delay: Arc<dyn Delay>,
    sink: Arc<dyn EventSink>,
}

impl<T: Transport> MeterManager<T> {
    /// Checks `config` against the transport once, up front.
    pub fn new(transport: T, config: ClientConfig) -> Result<Self> {
        let transport = Iec6205621Client::builder(transport)
            .config(config.clone())
            .build()?
            .into_transport();

        Ok(MeterManager {
            transport: Mutex::new(Some(transport)),
            config,
            delay: Arc::new(TokioDelay),
            sink: Arc::new(LogSink),
        })
    }

    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the transport, e.g. to inspect it after the manager is done.
    pub fn into_transport(self) -> Option<T> {
        self.transport.into_inner()
    }

    /// Reads the load profile for the inclusive date range.
    pub async fn get_profile(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ProfileData>> {
        let mut slot = self.transport.lock().await;
        let mut client = self.client(&mut slot)?;

        info!("Reading profile {start}..{end}");
        let result = match client.connect().await {
            Ok(()) => client.read_profile(start, end).await,
            Err(e) => Err(e),
        };
        Self::finish(&mut slot, client, result).await
    }

    /// Performs a standard readout.
    pub async fn get_standard_data(&self) -> Result<StandardData> {
        let mut slot = self.transport.lock().await;
        let mut client = self.client(&mut slot)?;

        info!("Reading standard data");
        let result = match client.connect().await {
            Ok(()) => client
                .standard_readout()
                .await
                .map(|answer| StandardData {
                    identification: client.identification().cloned(),
                    data: answer.data,
                }),
            Err(e) => Err(e),
        };
        Self::finish(&mut slot, client, result).await
    }

    fn client(&self, slot: &mut Option<T>) -> Result<Iec6205621Client<T>> {
        let transport = slot
            .take()
            .ok_or_else(|| Iec62056Error::Transport("transport unavailable".into()))?;
        Iec6205621Client::builder(transport)
            .config(self.config.clone())
            .delay(self.delay.clone())
            .event_sink(self.sink.clone())
            .build()
    }

    /// Disconnects and puts the transport back whatever the outcome. The
    /// operation's error wins over a disconnect error.
    async fn finish<R>(
        slot: &mut Option<T>,
        mut client: Iec6205621Client<T>,
        result: Result<R>,
    ) -> Result<R> {
        let closed = client.disconnect().await;
        *slot = Some(client.into_transport());

        let value = result?;
        if let Err(e) = closed {
            warn!("Disconnect failed: {e}");
            return Err(e);
        }
        Ok(value)
    }
}
