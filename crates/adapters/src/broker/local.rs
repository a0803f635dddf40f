// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local broker: launches the host as a child process with framed stdio.

use super::{BrokerError, HostBroker, HostConnection};
use crate::wire;
use async_trait::async_trait;
use rh_core::{HostStartupInfo, SessionId};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Host executable looked up under `<interpreter>/bin/` when the
/// interpreter path is an installation directory.
pub const HOST_BINARY_NAME: &str = "rhost-host";

#[derive(Debug, Clone)]
pub struct LocalBroker {
    name: String,
}

impl LocalBroker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Resolve the executable to launch from the interpreter path.
pub(crate) fn resolve_host_binary(interpreter: &Path) -> Result<PathBuf, BrokerError> {
    let candidate = if interpreter.is_dir() {
        interpreter.join("bin").join(HOST_BINARY_NAME)
    } else {
        interpreter.to_path_buf()
    };
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(BrokerError::HostMissing(candidate))
    }
}

pub(crate) fn host_command(program: &Path, session: SessionId, info: &HostStartupInfo) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(&info.args)
        .arg(format!("--rhost-name={}", info.name))
        .arg(format!("--rhost-session={}", session))
        .envs(info.env())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &info.working_dir {
        cmd.current_dir(dir);
    }
    cmd
}

#[async_trait]
impl HostBroker for LocalBroker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start_host(
        &self,
        session: SessionId,
        info: &HostStartupInfo,
    ) -> Result<HostConnection, BrokerError> {
        let program = resolve_host_binary(&info.interpreter)?;
        let mut child = host_command(&program, session, info)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BrokerError::HostMissing(program.clone()),
                _ => BrokerError::SpawnFailed(e.to_string()),
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrokerError::SpawnFailed("host stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrokerError::SpawnFailed("host stdout not captured".to_string()))?;
        let pid = child.id();
        let label = format!("{}:{}", self.name, session.short(8));
        tracing::info!(host = %label, ?pid, program = %program.display(), "host launched");

        let mut conn = wire::spawn_framed(&label, stdout, stdin);

        if let Some(stderr) = child.stderr.take() {
            let stderr_label = label.clone();
            let task = tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(host = %stderr_label, "{line}");
                }
            });
            conn.guard.push(task.abort_handle());
        }

        // Owns the child; aborting it drops the child, which kills the process.
        let supervisor = tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => tracing::info!(host = %label, %status, "host exited"),
                Err(e) => tracing::warn!(host = %label, error = %e, "host wait failed"),
            }
        });
        conn.guard.push(supervisor.abort_handle());

        Ok(conn)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
