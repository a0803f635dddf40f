// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debug overlay: breakpoints, stack snapshots and stepping on top of a
//! session's interactions and evaluations.
//!
//! A pause is a `browse` prompt. A monitor task inspects every pause and
//! raises [`BreakpointHit`] when execution stopped at a breakpoint.

mod breakpoint;
mod stack;
mod step;

pub use breakpoint::Breakpoint;
pub use stack::is_sourcing_frame;

use crate::error::DebugError;
use crate::session::{PauseSignal, Session};
use crate::turn::Nesting;
use breakpoint::BreakpointEntry;
use parking_lot::Mutex;
use rh_core::{PromptId, PromptInfo, SourceLocation, StackFrame};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const HIT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    /// Keep the frames `source()` adds in stack snapshots
    pub show_sourcing_frames: bool,
}

/// Execution paused at a breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointHit {
    pub location: SourceLocation,
    pub prompt: PromptId,
}

/// A pause being served. The browser re-prompts at the same place after
/// anything that does not resume execution.
struct Pause {
    prompt: PromptId,
    location: SourceLocation,
}

#[derive(Default)]
struct DebugState {
    breakpoints: BTreeMap<SourceLocation, Arc<BreakpointEntry>>,
    enabled: bool,
    pause: Option<Pause>,
}

pub(crate) struct DebugInner {
    session: Session,
    options: DebugOptions,
    state: Mutex<DebugState>,
    hits: broadcast::Sender<BreakpointHit>,
}

impl DebugInner {
    async fn describe(
        &self,
        at: Option<PromptId>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<StackFrame>, DebugError> {
        let value = match at {
            Some(prompt) => {
                self.session
                    .evaluate_at(prompt, stack::DESCRIBE_STACK, cancel)
                    .await?
            }
            None => {
                self.session
                    .evaluate(stack::DESCRIBE_STACK, Nesting::Reentrant, cancel)
                    .await?
            }
        };
        stack::frames_from_value(value, self.options.show_sourcing_frames)
    }

    /// Whether execution stopped on an enabled breakpoint.
    fn stopped_at_breakpoint(&self, frames: &[StackFrame]) -> bool {
        let state = self.state.lock();
        state.enabled
            && stack::top_location(frames).is_some_and(|loc| state.breakpoints.contains_key(&loc))
    }

    fn on_answer(&self, prompt: PromptId, text: &str) {
        let mut state = self.state.lock();
        let current = state.pause.as_ref().is_some_and(|p| p.prompt == prompt);
        if current && step::resumes_execution(text) {
            state.pause = None;
        }
    }

    async fn on_pause(&self, prompt: PromptInfo) {
        let frames = match self.describe(Some(prompt.id), None).await {
            Ok(frames) => frames,
            Err(e) => {
                tracing::debug!(prompt = %prompt.id, error = %e, "pause ended before inspection");
                return;
            }
        };
        let Some(location) = stack::top_location(&frames) else {
            return;
        };
        let entry = {
            let mut state = self.state.lock();
            let repeated = state.pause.as_ref().is_some_and(|p| p.location == location);
            state.pause = Some(Pause {
                prompt: prompt.id,
                location: location.clone(),
            });
            if repeated || !state.enabled {
                return;
            }
            match state.breakpoints.get(&location) {
                Some(entry) => entry.clone(),
                None => return,
            }
        };
        tracing::info!(%location, prompt = %prompt.id, "breakpoint hit");
        let hit = BreakpointHit {
            location,
            prompt: prompt.id,
        };
        entry.record(hit.clone());
        let _ = self.hits.send(hit);
    }
}

async fn monitor(inner: Arc<DebugInner>, mut pauses: mpsc::UnboundedReceiver<PauseSignal>) {
    while let Some(signal) = pauses.recv().await {
        match signal {
            PauseSignal::Opened(prompt) => inner.on_pause(prompt).await,
            PauseSignal::Answered { prompt, text } => inner.on_answer(prompt, &text),
            PauseSignal::Ended => inner.state.lock().pause = None,
        }
    }
}

/// Debugger attached to one session.
///
/// Dropping it stops pause monitoring; host-side breakpoints stay set.
pub struct DebugSession {
    inner: Arc<DebugInner>,
    monitor: JoinHandle<()>,
}

impl DebugSession {
    pub fn attach(session: &Session, options: DebugOptions) -> Self {
        let (hits, _) = broadcast::channel(HIT_CAPACITY);
        let inner = Arc::new(DebugInner {
            session: session.clone(),
            options,
            state: Mutex::new(DebugState::default()),
            hits,
        });
        let pauses = session.watch_pauses();
        let monitor = tokio::spawn(monitor(inner.clone(), pauses));
        Self { inner, monitor }
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Every breakpoint hit in this session.
    pub fn breakpoint_hits(&self) -> broadcast::Receiver<BreakpointHit> {
        self.inner.hits.subscribe()
    }

    /// Current breakpoint locations, ordered by file and line.
    pub fn breakpoints(&self) -> Vec<SourceLocation> {
        self.inner.state.lock().breakpoints.keys().cloned().collect()
    }

    pub fn breakpoints_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    /// Turn pausing at breakpoints on or off. Breakpoints stay tracked.
    pub async fn enable_breakpoints(
        &self,
        enable: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), DebugError> {
        let code = format!(
            "rhost:::enable_breakpoints({})",
            if enable { "TRUE" } else { "FALSE" }
        );
        self.inner
            .session
            .evaluate(&code, Nesting::Reentrant, cancel)
            .await?;
        self.inner.state.lock().enabled = enable;
        tracing::info!(enable, "breakpoints toggled");
        Ok(())
    }

    /// Snapshot of the paused stack, innermost frame first.
    pub async fn stack_frames(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<StackFrame>, DebugError> {
        self.inner.describe(None, cancel).await
    }
}

impl Drop for DebugSession {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
