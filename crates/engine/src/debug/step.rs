// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Browser stepping.
//!
//! A step answers the current `browse` prompt with a browser command and
//! waits for the next prompt. It reports whether execution stopped where the
//! step meant to, or at a breakpoint instead.

use super::{stack, DebugSession};
use crate::error::DebugError;
use crate::turn::Nesting;
use rh_core::PromptInfo;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Over,
    Into,
    Out,
}

impl StepKind {
    fn command(self) -> &'static str {
        match self {
            StepKind::Over => "n",
            StepKind::Into => "s",
            StepKind::Out => "f",
        }
    }
}

/// Browser commands that leave the current pause.
pub(super) fn resumes_execution(text: &str) -> bool {
    matches!(text.trim(), "" | "n" | "s" | "f" | "c" | "cont" | "Q")
}

impl DebugSession {
    /// Run to the next statement in the current frame.
    ///
    /// Returns false when execution stopped at a breakpoint.
    pub async fn step_over(&self, cancel: Option<&CancellationToken>) -> Result<bool, DebugError> {
        self.step(StepKind::Over, cancel).await
    }

    pub async fn step_into(&self, cancel: Option<&CancellationToken>) -> Result<bool, DebugError> {
        self.step(StepKind::Into, cancel).await
    }

    /// Run until the current function returns.
    ///
    /// At global scope there is nothing to return from: this steps over
    /// instead and returns false.
    pub async fn step_out(&self, cancel: Option<&CancellationToken>) -> Result<bool, DebugError> {
        self.step(StepKind::Out, cancel).await
    }

    /// Resume until the next breakpoint or the end of execution.
    pub async fn continue_execution(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), DebugError> {
        let at = self
            .inner
            .session
            .begin_interaction(Nesting::Reentrant, cancel)
            .await?;
        if !at.is_browser() {
            return Err(DebugError::NotPaused);
        }
        tracing::debug!(prompt = %at.prompt().id, "continuing");
        at.respond("c")?;
        Ok(())
    }

    /// Wait for the next prompt and require it to be a pause.
    pub async fn wait_for_pause(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<PromptInfo, DebugError> {
        let at = self
            .inner
            .session
            .begin_interaction(Nesting::Reentrant, cancel)
            .await?;
        if !at.is_browser() {
            return Err(DebugError::Indeterminate(format!(
                "expected a pause, got {:?} prompt {:?}",
                at.context(),
                at.prompt_text()
            )));
        }
        Ok(at.prompt().clone())
    }

    async fn step(
        &self,
        kind: StepKind,
        cancel: Option<&CancellationToken>,
    ) -> Result<bool, DebugError> {
        let session = &self.inner.session;
        let show_sourcing = self.inner.options.show_sourcing_frames;
        let at = session.begin_interaction(Nesting::Reentrant, cancel).await?;
        if !at.is_browser() {
            return Err(DebugError::NotPaused);
        }

        let mut command = kind.command();
        let mut completes = true;
        if kind == StepKind::Out {
            let value = at.evaluate(stack::DESCRIBE_STACK, cancel).await?;
            let frames = stack::frames_from_value(value, show_sourcing)?;
            if stack::at_global(&frames) {
                tracing::debug!("step out at global scope, stepping over");
                command = StepKind::Over.command();
                completes = false;
            }
        }

        // queued before answering so the next prompt cannot go elsewhere
        let next = session.queue_interaction(Nesting::Reentrant)?;
        tracing::debug!(command, prompt = %at.prompt().id, "stepping");
        at.respond(command)?;

        let next = next.wait(cancel).await?;
        if !next.is_browser() {
            return Ok(completes);
        }
        let value = next.evaluate(stack::DESCRIBE_STACK, cancel).await?;
        let frames = stack::frames_from_value(value, show_sourcing)?;
        let at_breakpoint = self.inner.stopped_at_breakpoint(&frames);
        if at_breakpoint {
            tracing::debug!(prompt = %next.prompt().id, "step stopped at a breakpoint");
        }
        Ok(completes && !at_breakpoint)
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
