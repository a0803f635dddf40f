// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-wide notifications

use crate::id::InstanceId;
use crate::message::{OutputStream, PromptInfo};
use std::fmt;

/// Why a session left the running state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client stopped the host
    Requested,
    /// The host closed the connection
    HostExited { status: Option<i32> },
    /// The transport failed underneath the session
    TransportFailed { message: String },
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Requested => write!(f, "stopped by request"),
            DisconnectReason::HostExited { status: Some(s) } => {
                write!(f, "host exited with status {s}")
            }
            DisconnectReason::HostExited { status: None } => write!(f, "host exited"),
            DisconnectReason::TransportFailed { message } => {
                write!(f, "transport failed: {message}")
            }
        }
    }
}

/// Events broadcast to every subscriber of a session.
///
/// Output and prompt events are delivered in the order the host emitted them.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected { instance: InstanceId },
    Output { stream: OutputStream, text: String },
    /// A prompt arrived; emitted before it is granted to any request
    Prompt(PromptInfo),
    /// `resetting` is set when the disconnect happened during the client's
    /// own stop or restart.
    Disconnected {
        reason: DisconnectReason,
        resetting: bool,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Connected { .. } => "session:connected",
            SessionEvent::Output { .. } => "session:output",
            SessionEvent::Prompt(_) => "session:prompt",
            SessionEvent::Disconnected { .. } => "session:disconnected",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
