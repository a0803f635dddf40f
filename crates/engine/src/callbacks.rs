// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side handlers for requests the host makes while it runs.

use async_trait::async_trait;
use rh_core::{BlobId, CallbackReply, HostCallback, LocatorPoint};

/// Answers host callbacks. Each call runs on its own task.
#[async_trait]
pub trait HostCallbacks: Send + Sync + 'static {
    async fn show_message(&self, message: &str) {
        tracing::info!(message, "host message");
    }

    /// Text to hand back to the host; empty when nothing was entered.
    async fn read_user_input(&self, prompt: &str, max_length: u32) -> String {
        let _ = (prompt, max_length);
        String::new()
    }

    /// The host produced a plot stored as a blob.
    async fn plot(&self, blob: BlobId) {
        let _ = blob;
    }

    async fn locator(&self) -> Option<LocatorPoint> {
        None
    }
}

/// Callbacks that answer everything with defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallbacks;

impl HostCallbacks for NoOpCallbacks {}

/// Run the handler for one callback and build the reply.
pub(crate) async fn answer(callbacks: &dyn HostCallbacks, callback: HostCallback) -> CallbackReply {
    match callback {
        HostCallback::ShowMessage { message } => {
            callbacks.show_message(&message).await;
            CallbackReply::Ack
        }
        HostCallback::ReadUserInput { prompt, max_length } => {
            let mut text = callbacks.read_user_input(&prompt, max_length).await;
            if max_length > 0 && text.len() > max_length as usize {
                let mut end = max_length as usize;
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.truncate(end);
            }
            CallbackReply::Input { text }
        }
        HostCallback::Plot { blob_id } => {
            callbacks.plot(blob_id).await;
            CallbackReply::Ack
        }
        HostCallback::Locator => CallbackReply::Locator {
            point: callbacks.locator().await,
        },
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingCallbacks;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    #![cfg_attr(coverage_nightly, coverage(off))]

    use super::HostCallbacks;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rh_core::{BlobId, HostCallback, LocatorPoint};
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Default)]
    struct State {
        calls: Vec<HostCallback>,
        inputs: VecDeque<String>,
        locator: Option<LocatorPoint>,
    }

    /// Records callbacks and replays scripted answers.
    #[derive(Clone, Default)]
    pub struct RecordingCallbacks {
        state: Arc<Mutex<State>>,
    }

    impl RecordingCallbacks {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an answer for the next `read_user_input`.
        pub fn push_input(&self, text: &str) {
            self.state.lock().inputs.push_back(text.to_string());
        }

        pub fn set_locator(&self, point: Option<LocatorPoint>) {
            self.state.lock().locator = point;
        }

        pub fn calls(&self) -> Vec<HostCallback> {
            self.state.lock().calls.clone()
        }
    }

    #[async_trait]
    impl HostCallbacks for RecordingCallbacks {
        async fn show_message(&self, message: &str) {
            self.state.lock().calls.push(HostCallback::ShowMessage {
                message: message.to_string(),
            });
        }

        async fn read_user_input(&self, prompt: &str, max_length: u32) -> String {
            let mut state = self.state.lock();
            state.calls.push(HostCallback::ReadUserInput {
                prompt: prompt.to_string(),
                max_length,
            });
            state.inputs.pop_front().unwrap_or_default()
        }

        async fn plot(&self, blob: BlobId) {
            self.state
                .lock()
                .calls
                .push(HostCallback::Plot { blob_id: blob });
        }

        async fn locator(&self) -> Option<LocatorPoint> {
            let mut state = self.state.lock();
            state.calls.push(HostCallback::Locator);
            state.locator
        }
    }
}

#[cfg(test)]
#[path = "callbacks_tests.rs"]
mod tests;
