// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the session engine

use rh_adapters::BrokerError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by session operations.
///
/// `Disconnected`, `Canceled`, `HostMissing` and `Evaluation` are the four
/// outcomes callers are expected to tell apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("host is not connected")]
    Disconnected,
    #[error("operation canceled")]
    Canceled,
    #[error("host binary not found: {0}")]
    HostMissing(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("host start timed out after {0:?}")]
    Timeout(Duration),
    #[error("broker error: {0}")]
    Broker(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("session has been disposed")]
    Disposed,
    #[error("no broker is configured")]
    NoBroker,
}

impl SessionError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, SessionError::Canceled)
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, SessionError::Disconnected)
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SessionError::InvalidOperation(message.into())
    }
}

impl From<BrokerError> for SessionError {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::HostMissing(path) => SessionError::HostMissing(path.display().to_string()),
            other => SessionError::Broker(other.to_string()),
        }
    }
}

/// Errors surfaced by the debug overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("the session is not paused in the debugger")]
    NotPaused,
    #[error("indeterminate debugger state: {0}")]
    Indeterminate(String),
    #[error("malformed stack description: {0}")]
    MalformedStack(String),
}
