// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framed message channel to a host process.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use crate::broker::{ConnectionGuard, HostConnection};
use rh_core::{ClientMessage, HostMessage};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Wire-level errors
#[derive(Debug, Error)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Maximum message size (200 MB)
pub const MAX_MESSAGE_SIZE: usize = 200 * 1024 * 1024;

/// Encode a message to JSON bytes (without length prefix)
///
/// Use with `write_message()` which handles the length-prefix wire format.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, WireError> {
    let json = serde_json::to_vec(msg)?;

    if json.len() > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    Ok(json)
}

/// Decode a message from wire format
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read a length-prefixed message from an async reader
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, WireError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed);
        }
        Err(e) => return Err(WireError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a length-prefixed message to an async writer
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), WireError> {
    let len = data.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(WireError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read and decode one frame
pub async fn read_frame<T, R>(reader: &mut R) -> Result<T, WireError>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let bytes = read_message(reader).await?;
    decode(&bytes)
}

/// Encode and write one frame
pub async fn write_frame<T, W>(writer: &mut W, msg: &T) -> Result<(), WireError>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let data = encode(msg)?;
    write_message(writer, &data).await
}

/// Pump a duplex byte stream into a [`HostConnection`].
///
/// A reader task decodes [`HostMessage`] frames onto the inbound channel
/// until EOF (channel closes) or an error (one `Err` then close). A writer
/// task drains the outbound channel; dropping every outbound sender shuts
/// the write half down. Both tasks are aborted when the connection guard
/// drops.
pub fn spawn_framed<R, W>(label: &str, mut reader: R, mut writer: W) -> HostConnection
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let (in_tx, in_rx) = mpsc::unbounded_channel();

    let read_label = label.to_string();
    let read_task = tokio::spawn(async move {
        loop {
            match read_frame::<HostMessage, _>(&mut reader).await {
                Ok(msg) => {
                    tracing::trace!(host = %read_label, kind = msg.name(), "frame in");
                    if in_tx.send(Ok(msg)).is_err() {
                        break;
                    }
                }
                Err(WireError::ConnectionClosed) => {
                    tracing::debug!(host = %read_label, "host stream closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(host = %read_label, error = %e, "host stream failed");
                    let _ = in_tx.send(Err(e));
                    break;
                }
            }
        }
    });

    let write_label = label.to_string();
    let write_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let kind = msg.name();
            match encode(&msg) {
                Ok(data) => {
                    tracing::trace!(host = %write_label, kind, bytes = data.len(), "frame out");
                    if let Err(e) = write_message(&mut writer, &data).await {
                        tracing::warn!(host = %write_label, kind, error = %e, "write failed");
                        break;
                    }
                }
                Err(e) => tracing::error!(host = %write_label, kind, error = %e, "encode failed"),
            }
        }
        let _ = writer.shutdown().await;
    });

    let mut guard = ConnectionGuard::default();
    guard.push(read_task.abort_handle());
    guard.push(write_task.abort_handle());
    HostConnection {
        outbound: out_tx,
        inbound: in_rx,
        guard,
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
