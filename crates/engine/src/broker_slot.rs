// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The provider's active broker and the switches that replace it.
//!
//! Switches to the same target share one connect attempt. Switches to
//! different targets race; whichever connect finishes last becomes current.
//! Host starts wait out switches in flight, and a start still connecting
//! when a switch lands is canceled.

use crate::error::SessionError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rh_adapters::{BrokerConnector, BrokerTarget, HostBroker, HostConnection};
use rh_core::{HostStartupInfo, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Launches a host for a session.
#[async_trait]
pub(crate) trait HostLauncher: Send + Sync + 'static {
    async fn launch(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, SessionError>;
}

struct SlotState<B> {
    current: Option<(BrokerTarget, B)>,
    in_flight: HashMap<BrokerTarget, watch::Receiver<Option<bool>>>,
}

pub(crate) struct BrokerSlot<C: BrokerConnector> {
    connector: C,
    state: Mutex<SlotState<C::Broker>>,
    /// Bumped each time the current broker changes
    generation: watch::Sender<u64>,
    /// Number of switches still connecting
    switching: watch::Sender<usize>,
}

impl<C: BrokerConnector> BrokerSlot<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            state: Mutex::new(SlotState {
                current: None,
                in_flight: HashMap::new(),
            }),
            generation: watch::channel(0).0,
            switching: watch::channel(0).0,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn current(&self) -> Option<BrokerTarget> {
        self.state.lock().current.as_ref().map(|(t, _)| t.clone())
    }

    /// Point future host starts at `target`.
    ///
    /// Returns false if the connect fails or `cancel` fires first. A
    /// canceled caller does not stop the connect for other callers.
    pub async fn switch(
        self: &Arc<Self>,
        target: BrokerTarget,
        cancel: Option<&CancellationToken>,
    ) -> bool {
        let mut done = {
            let mut state = self.state.lock();
            if state.current.as_ref().is_some_and(|(t, _)| *t == target) {
                tracing::debug!(%target, "already on broker");
                return true;
            }
            match state.in_flight.get(&target) {
                Some(rx) => {
                    tracing::debug!(%target, "joining switch in flight");
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.in_flight.insert(target.clone(), rx.clone());
                    self.switching.send_modify(|n| *n += 1);
                    tokio::spawn(self.clone().connect(target, tx));
                    rx
                }
            }
        };

        let finished = async {
            done.wait_for(Option::is_some)
                .await
                .map(|outcome| (*outcome).unwrap_or(false))
                .unwrap_or(false)
        };
        match cancel {
            Some(token) => tokio::select! {
                ok = finished => ok,
                _ = token.cancelled() => false,
            },
            None => finished.await,
        }
    }

    async fn connect(self: Arc<Self>, target: BrokerTarget, done: watch::Sender<Option<bool>>) {
        let result = self.connector.connect(&target).await;
        let ok = result.is_ok();
        {
            let mut state = self.state.lock();
            state.in_flight.remove(&target);
            match result {
                Ok(broker) => {
                    tracing::info!(%target, "switched broker");
                    state.current = Some((target, broker));
                    self.generation.send_modify(|g| *g += 1);
                }
                Err(e) => tracing::warn!(%target, error = %e, "broker switch failed"),
            }
            self.switching.send_modify(|n| *n = n.saturating_sub(1));
        }
        let _ = done.send(Some(ok));
    }
}

#[async_trait]
impl<C: BrokerConnector> HostLauncher for BrokerSlot<C> {
    async fn launch(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, SessionError> {
        let mut switching = self.switching.subscribe();
        if switching.wait_for(|n| *n == 0).await.is_err() {
            return Err(SessionError::NoBroker);
        }
        let mut generation = self.generation.subscribe();
        let (broker, seen) = {
            let state = self.state.lock();
            match &state.current {
                Some((_, broker)) => (broker.clone(), *generation.borrow_and_update()),
                None => return Err(SessionError::NoBroker),
            }
        };
        tracing::debug!(broker = broker.name(), "launching host");
        tokio::select! {
            result = broker.start_host(session, info) => result.map_err(SessionError::from),
            _ = generation.wait_for(|g| *g != seen) => {
                tracing::info!(broker = broker.name(), "broker switched during connect, canceling start");
                Err(SessionError::Canceled)
            }
        }
    }
}

#[cfg(test)]
#[path = "broker_slot_tests.rs"]
mod tests;
