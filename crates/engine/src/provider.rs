// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session provider: the registry of live sessions and the broker they
//! start hosts on.

use crate::broker_slot::{BrokerSlot, HostLauncher};
use crate::error::SessionError;
use crate::session::{Session, SessionOptions};
use parking_lot::Mutex;
use rh_adapters::{BrokerConnector, BrokerTarget};
use rh_core::{InstanceId, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Live sessions by id. `None` once the provider is disposed.
pub(crate) struct Registry {
    sessions: Mutex<Option<HashMap<SessionId, Session>>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            sessions: Mutex::new(Some(HashMap::new())),
        }
    }

    /// Drop the entry for `id` if it is still this instance.
    pub(crate) fn remove(&self, id: SessionId, instance: InstanceId) {
        let mut sessions = self.sessions.lock();
        let Some(map) = sessions.as_mut() else {
            return;
        };
        if map.get(&id).is_some_and(|s| s.instance() == instance) {
            map.remove(&id);
        }
    }

    fn close(&self) -> Vec<Session> {
        self.sessions
            .lock()
            .take()
            .map(|map| map.into_values().collect())
            .unwrap_or_default()
    }
}

pub struct SessionProvider<C: BrokerConnector> {
    slot: Arc<BrokerSlot<C>>,
    registry: Arc<Registry>,
    options: SessionOptions,
}

impl<C: BrokerConnector> SessionProvider<C> {
    pub fn new(connector: C) -> Self {
        Self::with_options(connector, SessionOptions::default())
    }

    pub fn with_options(connector: C, options: SessionOptions) -> Self {
        Self {
            slot: Arc::new(BrokerSlot::new(connector)),
            registry: Arc::new(Registry::new()),
            options,
        }
    }

    pub fn connector(&self) -> &C {
        self.slot.connector()
    }

    /// The session for `id`, created on first use.
    ///
    /// Concurrent callers for one id always see the same session. Once that
    /// session is disposed the next call creates a new instance.
    pub fn get_or_create(&self, id: SessionId) -> Result<Session, SessionError> {
        let mut sessions = self.registry.sessions.lock();
        let Some(map) = sessions.as_mut() else {
            return Err(SessionError::invalid("session provider has been disposed"));
        };
        let session = map.entry(id).or_insert_with(|| {
            let launcher: Arc<dyn HostLauncher> = self.slot.clone();
            let session = Session::new(
                id,
                launcher,
                Arc::downgrade(&self.registry),
                self.options.clone(),
            );
            tracing::info!(session_id = %id.short(8), instance = %session.instance(), "session created");
            session
        });
        Ok(session.clone())
    }

    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.registry
            .sessions
            .lock()
            .as_ref()
            .and_then(|map| map.get(&id).cloned())
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.registry
            .sessions
            .lock()
            .as_ref()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Point future host starts at `target`. See [`BrokerTarget`].
    ///
    /// Running sessions keep their current host.
    pub async fn try_switch_broker(
        &self,
        target: BrokerTarget,
        cancel: Option<&CancellationToken>,
    ) -> bool {
        self.slot.switch(target, cancel).await
    }

    pub fn current_broker(&self) -> Option<BrokerTarget> {
        self.slot.current()
    }

    pub fn is_disposed(&self) -> bool {
        self.registry.sessions.lock().is_none()
    }

    /// Refuse further sessions and dispose every live one.
    pub async fn dispose(&self) {
        let sessions = self.registry.close();
        tracing::info!(count = sessions.len(), "disposing session provider");
        for session in sessions {
            session.dispose().await;
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
