// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default connector mapping broker targets to local or remote brokers.

use super::{BrokerError, BrokerConnector, BrokerTarget, HostBroker, HostConnection};
use super::{LocalBroker, RemoteBroker};
use async_trait::async_trait;
use rh_core::{HostStartupInfo, SessionId};

const TCP_SCHEME: &str = "tcp://";

#[derive(Debug, Clone)]
pub enum AnyBroker {
    Local(LocalBroker),
    Remote(RemoteBroker),
}

#[async_trait]
impl HostBroker for AnyBroker {
    fn name(&self) -> &str {
        match self {
            AnyBroker::Local(b) => b.name(),
            AnyBroker::Remote(b) => b.name(),
        }
    }

    async fn start_host(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, BrokerError> {
        match self {
            AnyBroker::Local(b) => b.start_host(session, info).await,
            AnyBroker::Remote(b) => b.start_host(session, info).await,
        }
    }
}

/// Targets without a path (or with path `local`) launch hosts locally;
/// `tcp://host:port` paths reach a remote broker.
#[derive(Debug, Clone, Default)]
pub struct StandardConnector;

impl StandardConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BrokerConnector for StandardConnector {
    type Broker = AnyBroker;

    async fn connect(&self, target: &BrokerTarget) -> Result<AnyBroker, BrokerError> {
        match target.path.as_deref() {
            None | Some("local") => Ok(AnyBroker::Local(LocalBroker::new(&target.name))),
            Some(path) => match path.strip_prefix(TCP_SCHEME) {
                Some(addr) if !addr.is_empty() => {
                    let broker = RemoteBroker::new(&target.name, addr);
                    broker.probe().await?;
                    Ok(AnyBroker::Remote(broker))
                }
                _ => Err(BrokerError::Unsupported(path.to_string())),
            },
        }
    }
}

#[cfg(test)]
#[path = "standard_tests.rs"]
mod tests;
