// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host arguments shared by every command, and the session they open.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use rh_adapters::{BrokerTarget, StandardConnector};
use rh_core::{HostStartupInfo, SessionId};
use rh_engine::{HostCallbacks, Session, SessionError, SessionProvider};
use tokio_util::sync::CancellationToken;

use crate::env;

const LOCAL_BROKER: &str = "local";
const REMOTE_BROKER: &str = "remote";

#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// Interpreter binary or installation directory
    #[arg(long, env = env::INTERPRETER_VAR, value_name = "PATH")]
    pub interpreter: PathBuf,

    /// Extra argument for the host process (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Broker to launch through: `local` or `tcp://host:port`
    #[arg(long, default_value = LOCAL_BROKER)]
    pub broker: String,

    /// Host display name
    #[arg(long, default_value = "rh")]
    pub name: String,

    /// Host start timeout in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

impl HostArgs {
    pub fn broker_target(&self) -> BrokerTarget {
        match self.broker.as_str() {
            LOCAL_BROKER => BrokerTarget::local(),
            path => BrokerTarget::new(REMOTE_BROKER).with_path(path),
        }
    }

    pub fn startup_info(&self) -> HostStartupInfo {
        let info = HostStartupInfo::new(&self.name, &self.interpreter).with_args(&self.args);
        match std::env::current_dir() {
            Ok(dir) => info.with_working_dir(dir),
            Err(_) => info,
        }
    }

    pub fn start_timeout(&self) -> Duration {
        self.timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(rh_engine::env::start_timeout)
    }
}

/// One session on a provider pointed at the requested broker.
pub struct HostSession {
    provider: SessionProvider<StandardConnector>,
    session: Session,
}

impl HostSession {
    pub async fn connect(args: &HostArgs) -> Result<Self> {
        let provider = SessionProvider::new(StandardConnector::new());
        let target = args.broker_target();
        if !provider.try_switch_broker(target.clone(), None).await {
            anyhow::bail!("cannot reach broker {}", target);
        }
        let session = provider.get_or_create(SessionId::new_v4())?;
        Ok(Self { provider, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn start(
        &self,
        args: &HostArgs,
        callbacks: Arc<dyn HostCallbacks>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SessionError> {
        tracing::info!(interpreter = %args.interpreter.display(), broker = %args.broker, "starting host");
        self.session
            .start_host(args.startup_info(), callbacks, args.start_timeout(), cancel)
            .await
    }

    /// Stop the host and dispose the provider.
    pub async fn close(self) {
        self.session.stop_host().await;
        self.provider.dispose().await;
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
