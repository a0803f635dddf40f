// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker adapters: how a host process is reached.

mod local;
mod remote;
mod standard;

pub use local::{LocalBroker, HOST_BINARY_NAME};
pub use remote::{HandshakeReply, HandshakeRequest, RemoteBroker};
pub use standard::{AnyBroker, StandardConnector};

use crate::wire::WireError;
use async_trait::async_trait;
use rh_core::{ClientMessage, HostMessage, HostStartupInfo, SessionId};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Errors from broker operations
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("host binary not found: {}", .0.display())]
    HostMissing(PathBuf),

    #[error("broker unreachable: {0}")]
    Unreachable(String),

    #[error("failed to launch host: {0}")]
    SpawnFailed(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("unsupported broker path: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Names the broker a provider should use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerTarget {
    pub name: String,
    pub path: Option<String>,
}

impl BrokerTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// The conventional local broker target.
    pub fn local() -> Self {
        Self::new("local")
    }
}

impl fmt::Display for BrokerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}@{}", self.name, path),
            None => f.write_str(&self.name),
        }
    }
}

/// Aborts background I/O tasks of a connection when dropped.
#[derive(Debug, Default)]
pub struct ConnectionGuard {
    tasks: Vec<AbortHandle>,
}

impl ConnectionGuard {
    pub fn push(&mut self, handle: AbortHandle) {
        self.tasks.push(handle);
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// A connected duplex channel to one host process.
///
/// The inbound channel yields messages in host order. It closes on a clean
/// disconnect; a transport failure delivers one `Err` first.
#[derive(Debug)]
pub struct HostConnection {
    pub outbound: mpsc::UnboundedSender<ClientMessage>,
    pub inbound: mpsc::UnboundedReceiver<Result<HostMessage, WireError>>,
    pub guard: ConnectionGuard,
}

/// A connected broker able to launch hosts
#[async_trait]
pub trait HostBroker: Clone + Send + Sync + 'static {
    /// Broker name (matches the target it was connected for)
    fn name(&self) -> &str;

    /// Launch (or attach to) a host process for a session
    async fn start_host(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, BrokerError>;
}

/// Resolves broker targets into connected brokers
#[async_trait]
pub trait BrokerConnector: Clone + Send + Sync + 'static {
    type Broker: HostBroker;

    async fn connect(&self, target: &BrokerTarget) -> Result<Self::Broker, BrokerError>;
}

#[cfg(test)]
#[path = "../broker_tests.rs"]
mod tests;
