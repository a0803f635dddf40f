// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake brokers for testing
#![cfg_attr(coverage_nightly, coverage(off))]

mod host;
mod interpreter;

pub use host::FakeHost;
pub use interpreter::{FakeInterpreter, FakeProgram, PLOT_MAGIC};

use crate::broker::{BrokerConnector, BrokerError, BrokerTarget, HostBroker, HostConnection};
use async_trait::async_trait;
use parking_lot::Mutex;
use rh_core::{HostStartupInfo, SessionId};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Recorded broker call
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Connect {
        target: BrokerTarget,
    },
    StartHost {
        broker: String,
        session: SessionId,
        info: HostStartupInfo,
    },
}

/// What a fake broker attaches a started session to
#[derive(Debug, Clone, Default)]
pub enum HostMode {
    /// Hand each host to the test through [`FakeConnector::next_host`]
    #[default]
    Manual,
    /// Run a scripted [`FakeInterpreter`]
    Interpreter(FakeProgram),
}

struct FakeState {
    calls: Vec<BrokerCall>,
    failing_targets: HashSet<String>,
    held_targets: HashMap<String, watch::Sender<bool>>,
    missing_interpreters: HashSet<PathBuf>,
    start_failure: Option<String>,
    mode: HostMode,
    host_tx: mpsc::UnboundedSender<FakeHost>,
}

/// Fake broker connector with programmable outcomes
#[derive(Clone)]
pub struct FakeConnector {
    inner: Arc<Mutex<FakeState>>,
    hosts: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<FakeHost>>>,
    start_gate: Arc<watch::Sender<bool>>,
}

impl Default for FakeConnector {
    fn default() -> Self {
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (start_gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                failing_targets: HashSet::new(),
                held_targets: HashMap::new(),
                missing_interpreters: HashSet::new(),
                start_failure: None,
                mode: HostMode::Manual,
                host_tx,
            })),
            hosts: Arc::new(tokio::sync::Mutex::new(host_rx)),
            start_gate: Arc::new(start_gate),
        }
    }
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose hosts run the given program
    pub fn with_program(program: FakeProgram) -> Self {
        let connector = Self::default();
        connector.set_mode(HostMode::Interpreter(program));
        connector
    }

    pub fn set_mode(&self, mode: HostMode) {
        self.inner.lock().mode = mode;
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BrokerCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of connects issued for a broker name
    pub fn connect_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, BrokerCall::Connect { target } if target.name == name))
            .count()
    }

    /// Number of host starts issued through any broker
    pub fn start_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, BrokerCall::StartHost { .. }))
            .count()
    }

    /// Names of the brokers that started hosts, in call order
    pub fn started_on(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::StartHost { broker, .. } => Some(broker.clone()),
                _ => None,
            })
            .collect()
    }

    /// Make connects to this broker name fail
    pub fn fail_target(&self, name: &str) {
        self.inner.lock().failing_targets.insert(name.to_string());
    }

    /// Block connects to this broker name until [`release_target`](Self::release_target)
    pub fn hold_target(&self, name: &str) {
        let (tx, _) = watch::channel(false);
        self.inner.lock().held_targets.insert(name.to_string(), tx);
    }

    pub fn release_target(&self, name: &str) {
        if let Some(tx) = self.inner.lock().held_targets.remove(name) {
            let _ = tx.send(true);
        }
    }

    /// Report this interpreter path as missing on host start
    pub fn set_missing_interpreter(&self, path: impl Into<PathBuf>) {
        self.inner.lock().missing_interpreters.insert(path.into());
    }

    /// Make every host start fail with a launch error
    pub fn fail_starts(&self, message: &str) {
        self.inner.lock().start_failure = Some(message.to_string());
    }

    /// Block host starts (after they are recorded) until released
    pub fn hold_starts(&self) {
        self.start_gate.send_replace(false);
    }

    pub fn release_starts(&self) {
        self.start_gate.send_replace(true);
    }

    /// Wait until at least `n` host starts were recorded
    pub async fn wait_for_starts(&self, n: usize) {
        while self.start_count() < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    /// Wait until at least `n` connects were recorded for a broker name
    pub async fn wait_for_connects(&self, name: &str, n: usize) {
        while self.connect_count(name) < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    /// Next manually driven host, in start order
    pub async fn next_host(&self) -> Option<FakeHost> {
        let mut hosts = self.hosts.lock().await;
        tokio::time::timeout(Duration::from_secs(5), hosts.recv())
            .await
            .ok()
            .flatten()
    }
}

#[async_trait]
impl BrokerConnector for FakeConnector {
    type Broker = FakeBroker;

    async fn connect(&self, target: &BrokerTarget) -> Result<FakeBroker, BrokerError> {
        let gate = {
            let mut inner = self.inner.lock();
            inner.calls.push(BrokerCall::Connect {
                target: target.clone(),
            });
            inner.held_targets.get(&target.name).map(|tx| tx.subscribe())
        };
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
        if self.inner.lock().failing_targets.contains(&target.name) {
            return Err(BrokerError::Unreachable(target.to_string()));
        }
        Ok(FakeBroker {
            name: target.name.clone(),
            connector: self.clone(),
        })
    }
}

/// Broker handed out by [`FakeConnector`]; shares its state
#[derive(Clone)]
pub struct FakeBroker {
    name: String,
    connector: FakeConnector,
}

#[async_trait]
impl HostBroker for FakeBroker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start_host(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, BrokerError> {
        self.connector.inner.lock().calls.push(BrokerCall::StartHost {
            broker: self.name.clone(),
            session,
            info: info.clone(),
        });

        let mut gate = self.connector.start_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let inner = self.connector.inner.lock();
        if inner.missing_interpreters.contains(&info.interpreter) {
            return Err(BrokerError::HostMissing(info.interpreter.clone()));
        }
        if let Some(message) = &inner.start_failure {
            return Err(BrokerError::SpawnFailed(message.clone()));
        }
        match &inner.mode {
            HostMode::Interpreter(program) => Ok(FakeInterpreter::spawn(program.clone())),
            HostMode::Manual => {
                let (host, conn) = FakeHost::pair(session, &self.name, info.clone());
                let _ = inner.host_tx.send(host);
                Ok(conn)
            }
        }
    }
}

#[cfg(test)]
#[path = "../fake_tests.rs"]
mod tests;
