// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote broker reached over TCP.
//!
//! Each host start opens its own connection, sends a [`HandshakeRequest`]
//! frame and waits for a [`HandshakeReply`]. After an `ok` reply the same
//! connection carries the host's framed messages.

use super::{BrokerError, HostBroker, HostConnection};
use crate::env;
use crate::wire::{self, WireError};
use async_trait::async_trait;
use rh_core::{HostStartupInfo, SessionId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::net::TcpStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub session: SessionId,
    pub startup: HostStartupInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HandshakeReply {
    Ok,
    HostMissing { path: PathBuf },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct RemoteBroker {
    name: String,
    addr: String,
}

impl RemoteBroker {
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Check that the broker accepts connections.
    pub async fn probe(&self) -> Result<(), BrokerError> {
        open(&self.addr).await.map(drop)
    }
}

async fn open(addr: &str) -> Result<TcpStream, BrokerError> {
    match tokio::time::timeout(env::connect_timeout(), TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(BrokerError::Unreachable(format!("{addr}: {e}"))),
        Err(_) => Err(BrokerError::Wire(WireError::Timeout)),
    }
}

#[async_trait]
impl HostBroker for RemoteBroker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start_host(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, BrokerError> {
        let stream = open(&self.addr).await?;
        let (mut reader, mut writer) = stream.into_split();

        let request = HandshakeRequest {
            session,
            startup: info.clone(),
        };
        wire::write_frame(&mut writer, &request).await?;
        let reply = tokio::time::timeout(
            env::connect_timeout(),
            wire::read_frame::<HandshakeReply, _>(&mut reader),
        )
        .await
        .map_err(|_| WireError::Timeout)??;

        match reply {
            HandshakeReply::Ok => {
                let label = format!("{}:{}", self.name, session.short(8));
                tracing::info!(host = %label, addr = %self.addr, "remote host attached");
                Ok(wire::spawn_framed(&label, reader, writer))
            }
            HandshakeReply::HostMissing { path } => Err(BrokerError::HostMissing(path)),
            HandshakeReply::Error { message } => Err(BrokerError::Handshake(message)),
        }
    }
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
