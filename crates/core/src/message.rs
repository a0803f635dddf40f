// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged with a host interpreter process.
//!
//! Both directions serialize with `{"type": "snake_case_name", ...fields}`.
//! Binary payloads travel as base64 strings.

use crate::id::{BlobId, PromptId, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why the host is asking for console input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptContext {
    /// Top-level REPL prompt
    Normal,
    /// Execution is suspended in the debugger (browser prompt)
    Browse,
    /// Code being evaluated asked for a line of input
    Input,
}

impl PromptContext {
    pub fn is_browser(self) -> bool {
        matches!(self, PromptContext::Browse)
    }
}

/// A console prompt as announced by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInfo {
    pub id: PromptId,
    pub text: String,
    pub context: PromptContext,
    /// Maximum accepted reply length in bytes (0 = unlimited)
    #[serde(default)]
    pub max_length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Result of evaluating code on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvalOutcome {
    Ok { value: Value },
    Error { message: String },
    Canceled,
}

/// Body of a reply to a blob request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyBody {
    BlobCreated {
        blob_id: BlobId,
    },
    BlobData {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    BlobsDestroyed,
    Error {
        message: String,
    },
}

/// Requests the host makes of the client while it keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostCallback {
    ShowMessage { message: String },
    ReadUserInput { prompt: String, max_length: u32 },
    Plot { blob_id: BlobId },
    Locator,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocatorPoint {
    pub x: f64,
    pub y: f64,
}

/// Client answer to a [`HostCallback`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallbackReply {
    Ack,
    Input { text: String },
    Locator { point: Option<LocatorPoint> },
}

/// Host → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Prompt(PromptInfo),
    Output {
        stream: OutputStream,
        text: String,
    },
    EvalResult {
        request_id: RequestId,
        outcome: EvalOutcome,
    },
    Reply {
        request_id: RequestId,
        body: ReplyBody,
    },
    Callback {
        request_id: RequestId,
        callback: HostCallback,
    },
    /// The host is about to exit; the connection closes next.
    Exiting { status: i32 },
}

/// Client → host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Answer (and consume) an open prompt
    Respond { prompt_id: PromptId, text: String },
    /// Evaluate code at an open prompt without consuming it
    Evaluate {
        request_id: RequestId,
        prompt_id: PromptId,
        code: String,
    },
    /// Out-of-band interrupt
    Interrupt,
    CreateBlob {
        request_id: RequestId,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    GetBlob {
        request_id: RequestId,
        blob_id: BlobId,
    },
    DestroyBlobs {
        request_id: RequestId,
        blob_ids: Vec<BlobId>,
    },
    CallbackReply {
        request_id: RequestId,
        reply: CallbackReply,
    },
    /// Ask the host to exit
    Shutdown,
}

impl ClientMessage {
    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::Respond { .. } => "respond",
            ClientMessage::Evaluate { .. } => "evaluate",
            ClientMessage::Interrupt => "interrupt",
            ClientMessage::CreateBlob { .. } => "create_blob",
            ClientMessage::GetBlob { .. } => "get_blob",
            ClientMessage::DestroyBlobs { .. } => "destroy_blobs",
            ClientMessage::CallbackReply { .. } => "callback_reply",
            ClientMessage::Shutdown => "shutdown",
        }
    }
}

impl HostMessage {
    pub fn name(&self) -> &'static str {
        match self {
            HostMessage::Prompt(_) => "prompt",
            HostMessage::Output { .. } => "output",
            HostMessage::EvalResult { .. } => "eval_result",
            HostMessage::Reply { .. } => "reply",
            HostMessage::Callback { .. } => "callback",
            HostMessage::Exiting { .. } => "exiting",
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
