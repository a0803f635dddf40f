// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{NoOpCallbacks, Session, SessionOptions, SessionProvider};
use rh_adapters::{BrokerTarget, FakeConnector, FakeHost, FakeProgram};
use rh_core::{HostStartupInfo, SessionEvent, SessionId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub(crate) const TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn options() -> SessionOptions {
    SessionOptions {
        start_timeout: TIMEOUT,
        stop_grace: Duration::from_millis(200),
        event_capacity: 256,
    }
}

pub(crate) fn startup() -> HostStartupInfo {
    HostStartupInfo::new("test", "/usr/lib/R/bin/R")
}

/// Provider already switched to the broker named `local`.
pub(crate) async fn provider(connector: FakeConnector) -> SessionProvider<FakeConnector> {
    let provider = SessionProvider::with_options(connector, options());
    assert!(
        provider
            .try_switch_broker(BrokerTarget::new("local"), None)
            .await
    );
    provider
}

/// A running session whose host is driven by hand.
pub(crate) struct ManualSession {
    pub provider: SessionProvider<FakeConnector>,
    pub session: Session,
    pub host: FakeHost,
}

impl ManualSession {
    pub fn connector(&self) -> &FakeConnector {
        self.provider.connector()
    }
}

pub(crate) async fn manual_session() -> ManualSession {
    let provider = provider(FakeConnector::new()).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();
    session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap();
    let host = provider.connector().next_host().await.unwrap();
    ManualSession {
        provider,
        session,
        host,
    }
}

/// A running session backed by a scripted interpreter.
pub(crate) async fn interpreter_session(
    program: FakeProgram,
) -> (SessionProvider<FakeConnector>, Session) {
    let provider = provider(FakeConnector::with_program(program)).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();
    session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap();
    (provider, session)
}

/// Fail the test instead of hanging.
pub(crate) async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, fut)
        .await
        .expect("timed out")
}

/// Next event matching `pred`.
pub(crate) async fn next_event(
    events: &mut broadcast::Receiver<SessionEvent>,
    pred: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    within(async {
        loop {
            let event = events.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    })
    .await
}

/// `main.R` calls `greet()` from `lib.R` on line 2.
pub(crate) fn debug_program() -> FakeProgram {
    FakeProgram::new()
        .with_file("main.R", "a <- 1\ngreet()\nb <- 2\nc <- 3")
        .with_file("lib.R", "msg <- 'hi'\ncat(msg)")
        .with_function("greet", "lib.R", 1, 2)
}

/// Source `file` at the top-level prompt in the background.
pub(crate) fn run_script(
    session: &Session,
    file: &str,
) -> tokio::task::JoinHandle<Result<serde_json::Value, crate::SessionError>> {
    let session = session.clone();
    let code = format!("source('{file}')");
    tokio::spawn(async move {
        session
            .evaluate(&code, crate::Nesting::TopLevel, None)
            .await
    })
}
