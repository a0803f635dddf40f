// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::broker::{ConnectionGuard, HostConnection};
use crate::wire::WireError;
use rh_core::{
    ClientMessage, EvalOutcome, HostCallback, HostMessage, HostStartupInfo, OutputStream,
    PromptContext, PromptId, PromptInfo, ReplyBody, RequestId, SessionId,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// A host driven step by step from a test.
pub struct FakeHost {
    pub session: SessionId,
    pub broker: String,
    pub info: HostStartupInfo,
    tx: Option<mpsc::UnboundedSender<Result<HostMessage, WireError>>>,
    rx: mpsc::UnboundedReceiver<ClientMessage>,
    next_prompt: u64,
}

impl FakeHost {
    /// A host and the client side of its channel.
    pub fn pair(session: SessionId, broker: &str, info: HostStartupInfo) -> (Self, HostConnection) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let host = Self {
            session,
            broker: broker.to_string(),
            info,
            tx: Some(in_tx),
            rx: out_rx,
            next_prompt: 1,
        };
        let conn = HostConnection {
            outbound: out_tx,
            inbound: in_rx,
            guard: ConnectionGuard::default(),
        };
        (host, conn)
    }

    /// Deliver a message; false once the client side is gone.
    pub fn send(&self, msg: HostMessage) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.send(Ok(msg)).is_ok())
    }

    /// Announce a prompt with a default text for its context.
    pub fn prompt(&mut self, context: PromptContext) -> PromptId {
        let text = match context {
            PromptContext::Normal => "> ",
            PromptContext::Browse => "Browse[1]> ",
            PromptContext::Input => "? ",
        };
        self.prompt_with(text, context)
    }

    pub fn prompt_with(&mut self, text: &str, context: PromptContext) -> PromptId {
        let id = PromptId::new(self.next_prompt);
        self.next_prompt += 1;
        self.send(HostMessage::Prompt(PromptInfo {
            id,
            text: text.to_string(),
            context,
            max_length: 0,
        }));
        id
    }

    pub fn output(&self, text: &str) {
        self.send(HostMessage::Output {
            stream: OutputStream::Stdout,
            text: text.to_string(),
        });
    }

    pub fn eval_result(&self, request_id: RequestId, outcome: EvalOutcome) {
        self.send(HostMessage::EvalResult {
            request_id,
            outcome,
        });
    }

    pub fn reply(&self, request_id: RequestId, body: ReplyBody) {
        self.send(HostMessage::Reply { request_id, body });
    }

    pub fn callback(&self, request_id: RequestId, callback: HostCallback) {
        self.send(HostMessage::Callback {
            request_id,
            callback,
        });
    }

    /// Next message from the client (None after 5s of silence or on close)
    pub async fn recv(&mut self) -> Option<ClientMessage> {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Next message if one is already queued
    pub fn try_recv(&mut self) -> Option<ClientMessage> {
        self.rx.try_recv().ok()
    }

    /// Wait for a `respond` and return its prompt id and text
    pub async fn recv_respond(&mut self) -> Option<(PromptId, String)> {
        match self.recv().await? {
            ClientMessage::Respond { prompt_id, text } => Some((prompt_id, text)),
            _ => None,
        }
    }

    /// Wait for an `evaluate` and return its request id, prompt id and code
    pub async fn recv_evaluate(&mut self) -> Option<(RequestId, PromptId, String)> {
        match self.recv().await? {
            ClientMessage::Evaluate {
                request_id,
                prompt_id,
                code,
            } => Some((request_id, prompt_id, code)),
            _ => None,
        }
    }

    /// Report a transport failure, then close
    pub fn fail(&mut self, message: &str) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(WireError::Io(std::io::Error::other(message.to_string()))));
        }
    }

    /// Exit cleanly with a status, then close
    pub fn exit(&mut self, status: i32) {
        self.send(HostMessage::Exiting { status });
        self.tx = None;
    }

    /// Close the channel without notice
    pub fn disconnect(&mut self) {
        self.tx = None;
    }
}
