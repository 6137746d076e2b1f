//! # Framed Link I/O
//!
//! Byte-level reading shared by the serial and TCP transports: end-of-message
//! detection for data blocks, the partial-block handshake, and the
//! start/end-character read used for the identification frame. Reads are
//! bounded by an inter-character timeout: the meter may take as long as it
//! likes over a whole message, but every byte must arrive within the timeout
//! of the one before. An expired wait is a [`Iec62056Error::Timeout`] and is
//! never retried here.
//!
//! ## Partial blocks
//!
//! A block ending in EOT is one part of a longer message. Its BCC is checked
//! and the meter is answered with ACK (next block please) or NAK (repeat the
//! block). The bodies are joined as received, without the STX of every part
//! after the first, so a value split across two blocks comes out whole. The
//! joined message gets a fresh BCC and decodes like a single block.

use crate::constants::{ACK, EOT, ETX, NAK, SOH, STX};
use crate::error::{Iec62056Error, Result};
use crate::iec::bcc::{add_bcc, bcc_valid, verify_bcc};
use crate::util::hex::format_frame;
use bytes::{BufMut, BytesMut};
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Runs `fut` under `timeout`, reporting expiry as a timeout of `operation`.
async fn deadline<T>(
    timeout: Duration,
    operation: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Iec62056Error::Timeout {
            operation: operation.to_string(),
        })?
}

async fn read_byte<S>(
    stream: &mut S,
    inter_char_timeout: Duration,
    operation: &str,
) -> Result<u8>
where
    S: AsyncRead + Unpin + Send,
{
    deadline(inter_char_timeout, operation, async {
        stream.read_u8().await.map_err(Iec62056Error::from)
    })
    .await
}

/// Reads one framed message from `stream`, answering partial blocks.
pub async fn read_frame<S>(stream: &mut S, inter_char_timeout: Duration) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut total = BytesMut::new();

    loop {
        let mut block = BytesMut::new();

        let start = loop {
            let b = read_byte(stream, inter_char_timeout, "read").await?;
            if b == SOH || b == STX {
                break b;
            }
        };
        block.put_u8(start);

        let end = loop {
            let b = read_byte(stream, inter_char_timeout, "read").await?;
            block.put_u8(b);
            if b == ETX || b == EOT {
                break b;
            }
        };
        block.put_u8(read_byte(stream, inter_char_timeout, "read").await?);

        if start == SOH {
            return Ok(block.to_vec());
        }

        if end == EOT {
            if !bcc_valid(&block) {
                warn!("Partial block failed BCC, requesting repeat: {}", format_frame(&block));
                stream.write_all(&[NAK]).await?;
                stream.flush().await?;
                continue;
            }
            stream.write_all(&[ACK]).await?;
            stream.flush().await?;

            // drop EOT and BCC, and the STX of every block after the first
            let body = &block[..block.len() - 2];
            let body = if total.is_empty() { body } else { &body[1..] };
            total.extend_from_slice(body);
            debug!("Received partial block, {} bytes so far", total.len());
            continue;
        }

        if total.is_empty() {
            return Ok(block.to_vec());
        }

        verify_bcc(&block)?;
        // keep ETX, drop STX and the block's own BCC
        total.extend_from_slice(&block[1..block.len() - 1]);
        return add_bcc(&total);
    }
}

/// Skips input until `start`, then reads through `end` inclusive.
pub async fn read_between<S>(
    stream: &mut S,
    start: u8,
    end: u8,
    inter_char_timeout: Duration,
) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin + Send,
{
    while read_byte(stream, inter_char_timeout, "simple_read").await? != start {}

    let mut data = vec![start];
    loop {
        let b = read_byte(stream, inter_char_timeout, "simple_read").await?;
        data.push(b);
        if b == end {
            return Ok(data);
        }
    }
}

/// A connectable byte stream with an inter-character timeout.
#[derive(Debug)]
pub struct Link<S> {
    stream: Option<S>,
    inter_char_timeout: Duration,
}

impl<S> Link<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(inter_char_timeout: Duration) -> Self {
        Link {
            stream: None,
            inter_char_timeout,
        }
    }

    pub fn attach(&mut self, stream: S) {
        self.stream = Some(stream);
    }

    pub fn detach(&mut self) -> Option<S> {
        self.stream.take()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn inter_char_timeout(&self) -> Duration {
        self.inter_char_timeout
    }

    pub fn stream_mut(&mut self) -> Result<&mut S> {
        self.stream
            .as_mut()
            .ok_or_else(|| Iec62056Error::Transport("not connected".into()))
    }

    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.inter_char_timeout;
        let stream = self.stream_mut()?;
        deadline(timeout, "send", async {
            stream.write_all(data).await?;
            stream.flush().await?;
            Ok(())
        })
        .await
    }

    /// Reads exactly `n` bytes, each within the inter-character timeout.
    pub async fn recv(&mut self, n: usize) -> Result<Vec<u8>> {
        let timeout = self.inter_char_timeout;
        let stream = self.stream_mut()?;
        let mut buf = Vec::with_capacity(n);
        for _ in 0..n {
            buf.push(read_byte(stream, timeout, "recv").await?);
        }
        Ok(buf)
    }

    pub async fn read(&mut self) -> Result<Vec<u8>> {
        let timeout = self.inter_char_timeout;
        read_frame(self.stream_mut()?, timeout).await
    }

    pub async fn simple_read(&mut self, start: u8, end: u8) -> Result<Vec<u8>> {
        let timeout = self.inter_char_timeout;
        read_between(self.stream_mut()?, start, end, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_single_block_is_returned_as_is() {
        let frame = add_bcc(b"\x021.8.0(1)\r\n!\r\n\x03").unwrap();
        let mut mock = Builder::new().read(&frame).build();
        assert_eq!(read_frame(&mut mock, WAIT).await.unwrap(), frame);
    }

    #[tokio::test]
    async fn test_leading_noise_is_skipped() {
        let frame = add_bcc(b"\x02(1)\x03").unwrap();
        let mut input = b"\x00\xff".to_vec();
        input.extend_from_slice(&frame);
        let mut mock = Builder::new().read(&input).build();
        assert_eq!(read_frame(&mut mock, WAIT).await.unwrap(), frame);
    }

    #[tokio::test]
    async fn test_read_between_stops_at_end_char() {
        let mut mock = Builder::new().read(b"\r\n/ISK5MT174-0033\r\n").build();
        let data = read_between(&mut mock, b'/', b'\n', WAIT).await.unwrap();
        assert_eq!(data, b"/ISK5MT174-0033\r\n".to_vec());
    }

    #[tokio::test]
    async fn test_eof_is_transport_error() {
        let mut mock = Builder::new().read(b"\x02(1").build();
        let err = read_frame(&mut mock, WAIT).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_stall_between_bytes_times_out() {
        let mut mock = Builder::new()
            .read(b"\x02(1")
            .wait(Duration::from_millis(200))
            .build();
        match read_frame(&mut mock, Duration::from_millis(50)).await {
            Err(Iec62056Error::Timeout { operation }) => assert_eq!(operation, "read"),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
