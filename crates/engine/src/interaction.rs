// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handles for requests that hold a host prompt.
//!
//! Dropping a handle without responding releases the prompt to the next
//! waiter. Dropping a [`PendingTurn`] before it is granted withdraws it.

use crate::error::SessionError;
use crate::session::{evaluate_with, outcome_value, settle, Core, PauseSignal};
use crate::turn::{Grant, Pending, WaiterId};
use rh_core::{PromptContext, PromptInfo};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A queued request that has not been granted a prompt yet.
pub struct PendingTurn {
    core: Arc<Core>,
    waiter: WaiterId,
    rx: Option<Pending<Grant>>,
    granted: bool,
}

impl PendingTurn {
    pub(crate) fn new(core: Arc<Core>, waiter: WaiterId, rx: Pending<Grant>) -> Self {
        Self {
            core,
            waiter,
            rx: Some(rx),
            granted: false,
        }
    }

    /// Wait until the request is granted a prompt.
    pub async fn wait(
        mut self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Interaction, SessionError> {
        let Some(rx) = self.rx.take() else {
            return Err(SessionError::invalid("request already resolved"));
        };
        let grant = settle(rx, cancel).await?;
        self.granted = true;
        tracing::debug!(
            parent: &self.core.span,
            waiter = %self.waiter,
            prompt = %grant.prompt.id,
            depth = grant.depth,
            "interaction granted"
        );
        Ok(Interaction {
            core: self.core.clone(),
            waiter: self.waiter,
            grant,
            finished: false,
        })
    }
}

impl Drop for PendingTurn {
    fn drop(&mut self) {
        // covers a grant that landed after the caller stopped waiting
        if !self.granted {
            self.core.release(self.waiter);
        }
    }
}

/// Exclusive use of one open prompt.
pub struct Interaction {
    core: Arc<Core>,
    waiter: WaiterId,
    grant: Grant,
    finished: bool,
}

impl fmt::Debug for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interaction")
            .field("prompt", &self.grant.prompt)
            .field("depth", &self.grant.depth)
            .finish()
    }
}

impl Interaction {
    pub fn prompt(&self) -> &PromptInfo {
        &self.grant.prompt
    }

    pub fn prompt_text(&self) -> &str {
        &self.grant.prompt.text
    }

    pub fn context(&self) -> PromptContext {
        self.grant.prompt.context
    }

    /// Execution is paused in the debugger.
    pub fn is_browser(&self) -> bool {
        self.grant.prompt.context.is_browser()
    }

    /// Nesting depth of the prompt; 0 is top level.
    pub fn depth(&self) -> usize {
        self.grant.depth
    }

    /// Answer the prompt. Consumes the interaction.
    pub fn respond(mut self, text: &str) -> Result<(), SessionError> {
        let mut inner = self.core.inner.lock();
        inner.turns.respond(self.waiter, text.to_string())?;
        inner.signal_pause(PauseSignal::Answered {
            prompt: self.grant.prompt.id,
            text: text.to_string(),
        });
        self.finished = true;
        Ok(())
    }

    /// Evaluate code at this prompt without answering it.
    pub async fn evaluate(
        &self,
        code: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, SessionError> {
        let evaluated = evaluate_with(&self.core, Some(self.waiter), None, code, cancel).await?;
        outcome_value(evaluated.outcome)
    }
}

impl Drop for Interaction {
    fn drop(&mut self) {
        if !self.finished {
            self.core.release(self.waiter);
        }
    }
}

/// Exclusive use of one open prompt for running evaluations.
///
/// The prompt is never answered; dropping the scope releases it.
#[derive(Debug)]
pub struct EvaluationScope {
    interaction: Interaction,
}

impl From<Interaction> for EvaluationScope {
    fn from(interaction: Interaction) -> Self {
        Self { interaction }
    }
}

impl EvaluationScope {
    pub fn prompt(&self) -> &PromptInfo {
        self.interaction.prompt()
    }

    pub fn is_browser(&self) -> bool {
        self.interaction.is_browser()
    }

    pub fn depth(&self) -> usize {
        self.interaction.depth()
    }

    pub async fn evaluate(
        &self,
        code: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, SessionError> {
        self.interaction.evaluate(code, cancel).await
    }
}

#[cfg(test)]
#[path = "interaction_tests.rs"]
mod tests;
