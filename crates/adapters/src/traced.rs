// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced broker wrappers for consistent observability

use crate::broker::{BrokerConnector, BrokerError, BrokerTarget, HostBroker, HostConnection};
use async_trait::async_trait;
use rh_core::{HostStartupInfo, SessionId};
use tracing::Instrument;

/// Wrapper that adds tracing to any BrokerConnector
#[derive(Clone)]
pub struct TracedConnector<C> {
    inner: C,
}

impl<C> TracedConnector<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: BrokerConnector> BrokerConnector for TracedConnector<C> {
    type Broker = TracedBroker<C::Broker>;

    async fn connect(&self, target: &BrokerTarget) -> Result<Self::Broker, BrokerError> {
        async {
            tracing::info!("connecting");
            let start = std::time::Instant::now();
            let result = self.inner.connect(target).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "broker connected"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "connect failed"),
            }
            result.map(TracedBroker::new)
        }
        .instrument(tracing::info_span!("broker.connect", target = %target))
        .await
    }
}

/// Wrapper that adds tracing to any HostBroker
#[derive(Clone)]
pub struct TracedBroker<B> {
    inner: B,
}

impl<B> TracedBroker<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: HostBroker> HostBroker for TracedBroker<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn start_host(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, BrokerError> {
        async {
            tracing::info!(args = info.args.len(), "starting host");
            let start = std::time::Instant::now();
            let result = self.inner.start_host(session, info).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "host started"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "host start failed"),
            }
            result
        }
        .instrument(tracing::info_span!(
            "broker.start_host",
            broker = self.inner.name(),
            session = %session,
            host = %info.name,
        ))
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
