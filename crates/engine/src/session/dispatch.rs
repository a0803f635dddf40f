// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound host traffic: one reader task per connection.

use super::{Core, PauseSignal};
use crate::callbacks;
use rh_adapters::WireError;
use rh_core::{ClientMessage, HostMessage, SessionEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Drain the connection until it closes.
///
/// Messages are applied in host order under the session lock, so events
/// and prompt grants never overtake each other.
pub(super) async fn read_host(
    core: Arc<Core>,
    epoch: u64,
    mut inbound: mpsc::UnboundedReceiver<Result<HostMessage, WireError>>,
) {
    let failure = loop {
        match inbound.recv().await {
            Some(Ok(msg)) => core.dispatch(epoch, msg),
            Some(Err(e)) => break Some(e.to_string()),
            None => break None,
        }
    };
    core.on_host_closed(epoch, failure);
}

impl Core {
    fn dispatch(self: &Arc<Self>, epoch: u64, msg: HostMessage) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            tracing::trace!(kind = msg.name(), "message from a superseded connection");
            return;
        }
        match msg {
            HostMessage::Prompt(prompt) => {
                self.emit(SessionEvent::Prompt(prompt.clone()));
                inner.signal_pause(if prompt.context.is_browser() {
                    PauseSignal::Opened(prompt.clone())
                } else {
                    PauseSignal::Ended
                });
                inner.turns.on_prompt(prompt);
            }
            HostMessage::Output { stream, text } => {
                tracing::trace!(?stream, bytes = text.len(), "output");
                self.emit(SessionEvent::Output { stream, text });
            }
            HostMessage::EvalResult {
                request_id,
                outcome,
            } => inner.turns.on_eval_result(request_id, outcome),
            HostMessage::Reply { request_id, body } => inner.blobs.on_reply(request_id, body),
            HostMessage::Callback {
                request_id,
                callback,
            } => {
                let Some(outbound) = inner.live.as_ref().map(|l| l.outbound.clone()) else {
                    return;
                };
                let handlers = inner.callbacks.clone();
                let kind = callback_kind(&callback);
                tracing::debug!(request = %request_id, kind, "host callback");
                tokio::spawn(
                    async move {
                        let reply = callbacks::answer(handlers.as_ref(), callback).await;
                        if outbound
                            .send(ClientMessage::CallbackReply { request_id, reply })
                            .is_err()
                        {
                            tracing::debug!(request = %request_id, "host gone before callback reply");
                        }
                    }
                    .instrument(self.span.clone()),
                );
            }
            HostMessage::Exiting { status } => {
                tracing::info!(status, "host exiting");
                inner.exit_status = Some(status);
            }
        }
    }
}

fn callback_kind(callback: &rh_core::HostCallback) -> &'static str {
    match callback {
        rh_core::HostCallback::ShowMessage { .. } => "show_message",
        rh_core::HostCallback::ReadUserInput { .. } => "read_user_input",
        rh_core::HostCallback::Plot { .. } => "plot",
        rh_core::HostCallback::Locator => "locator",
    }
}
