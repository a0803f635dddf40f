// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turn manager: admits interactions and evaluations against host prompts.
//!
//! Every prompt the host opens becomes an *activation* on a stack. A prompt
//! that arrives while the top activation is evaluating nests one level
//! deeper; a prompt on an empty stack is depth 0. An idle activation is
//! granted to at most one holder, picked from the reentrant queue first and
//! then (at depth 0 only) from the top-level queue. One-shot evaluations
//! borrow the top activation without holding it.
//!
//! The manager is synchronous. It lives inside the session lock and is
//! driven by client calls and inbound host messages.

use crate::error::SessionError;
use rh_core::{ClientMessage, EvalOutcome, PromptId, PromptInfo, RequestId};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tokio::sync::{mpsc, oneshot};

/// Where a request may be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nesting {
    /// Only a depth-0 prompt with no request holding it
    TopLevel,
    /// Whatever prompt is innermost, as soon as it is free
    Reentrant,
}

/// Identifies a queued or granted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(u64);

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// The prompt handed to a holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub prompt: PromptInfo,
    pub depth: usize,
}

/// An evaluation result together with the prompt it ran at.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub prompt: PromptId,
    pub outcome: EvalOutcome,
}

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;
pub(crate) type Pending<T> = oneshot::Receiver<Result<T, SessionError>>;

struct Activation {
    prompt: PromptInfo,
    depth: usize,
    holder: Option<WaiterId>,
    evaluating: Option<RequestId>,
}

struct HoldWaiter {
    id: WaiterId,
    tx: Reply<Grant>,
}

struct EvalWaiter {
    id: WaiterId,
    target: Option<PromptId>,
    request_id: RequestId,
    code: String,
    tx: Reply<Evaluated>,
}

#[derive(Default)]
pub(crate) struct TurnManager {
    stack: Vec<Activation>,
    top_level: VecDeque<HoldWaiter>,
    reentrant: VecDeque<HoldWaiter>,
    evals: VecDeque<EvalWaiter>,
    in_flight: HashMap<RequestId, (PromptId, Reply<Evaluated>)>,
    revoked: HashMap<WaiterId, SessionError>,
    next_waiter: u64,
    outbound: Option<mpsc::UnboundedSender<ClientMessage>>,
}

impl TurnManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route requests to a newly connected host.
    pub fn attach(&mut self, outbound: mpsc::UnboundedSender<ClientMessage>) {
        self.outbound = Some(outbound);
    }

    /// Forget the host and fail everything outstanding.
    pub fn detach(&mut self, err: SessionError) {
        self.outbound = None;
        self.fail_all(err);
    }

    pub fn depth(&self) -> Option<usize> {
        self.stack.last().map(|a| a.depth)
    }

    /// The innermost open prompt.
    pub fn open_prompt(&self) -> Option<&PromptInfo> {
        self.stack.last().map(|a| &a.prompt)
    }

    pub fn waiting(&self) -> usize {
        self.top_level.len() + self.reentrant.len() + self.evals.len()
    }

    fn next_id(&mut self) -> WaiterId {
        self.next_waiter += 1;
        WaiterId(self.next_waiter)
    }

    /// Queue a request for exclusive use of a prompt.
    pub fn hold(&mut self, nesting: Nesting) -> (WaiterId, Pending<Grant>) {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        let waiter = HoldWaiter { id, tx };
        match nesting {
            Nesting::TopLevel => self.top_level.push_back(waiter),
            Nesting::Reentrant => self.reentrant.push_back(waiter),
        }
        tracing::debug!(waiter = %id, ?nesting, "request queued");
        self.pump();
        (id, rx)
    }

    /// Queue a one-shot evaluation, optionally pinned to one prompt.
    ///
    /// A pinned evaluation fails at once if its prompt is not open and
    /// whenever that prompt closes before the evaluation was sent.
    pub fn eval(
        &mut self,
        target: Option<PromptId>,
        request_id: RequestId,
        code: String,
    ) -> (WaiterId, Pending<Evaluated>) {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        if let Some(prompt) = target {
            if !self.stack.iter().any(|a| a.prompt.id == prompt) {
                let _ = tx.send(Err(prompt_closed(prompt)));
                return (id, rx);
            }
        }
        self.evals.push_back(EvalWaiter {
            id,
            target,
            request_id,
            code,
            tx,
        });
        self.pump();
        (id, rx)
    }

    /// Evaluate at the prompt held by `holder`.
    pub fn eval_as(
        &mut self,
        holder: WaiterId,
        request_id: RequestId,
        code: String,
    ) -> Result<(WaiterId, Pending<Evaluated>), SessionError> {
        let prompt = self.held_prompt(holder)?;
        Ok(self.eval(Some(prompt), request_id, code))
    }

    fn held_prompt(&self, holder: WaiterId) -> Result<PromptId, SessionError> {
        match self.stack.iter().find(|a| a.holder == Some(holder)) {
            Some(activation) => Ok(activation.prompt.id),
            None => Err(self.revoked_reason(holder)),
        }
    }

    fn revoked_reason(&self, holder: WaiterId) -> SessionError {
        self.revoked
            .get(&holder)
            .cloned()
            .unwrap_or_else(|| SessionError::invalid("the prompt is no longer open"))
    }

    /// Answer the prompt held by `holder`, consuming it.
    pub fn respond(&mut self, holder: WaiterId, text: String) -> Result<(), SessionError> {
        let Some(index) = self.stack.iter().position(|a| a.holder == Some(holder)) else {
            return Err(self.revoked_reason(holder));
        };
        if self.stack[index].evaluating.is_some() {
            return Err(SessionError::invalid(
                "cannot respond while an evaluation is running at this prompt",
            ));
        }
        if index + 1 != self.stack.len() {
            return Err(SessionError::invalid("a nested prompt is still open"));
        }
        let prompt_id = self.stack[index].prompt.id;
        self.send(ClientMessage::Respond { prompt_id, text })?;
        self.stack.pop();
        tracing::debug!(waiter = %holder, prompt = %prompt_id, "prompt answered");
        self.fail_pinned(prompt_id, None);
        self.pump();
        Ok(())
    }

    /// Drop a queued or granted hold request without answering.
    pub fn release(&mut self, waiter: WaiterId) {
        self.revoked.remove(&waiter);
        if remove_waiter(&mut self.top_level, waiter) || remove_waiter(&mut self.reentrant, waiter)
        {
            tracing::debug!(%waiter, "queued request withdrawn");
            return;
        }
        if let Some(activation) = self.stack.iter_mut().find(|a| a.holder == Some(waiter)) {
            activation.holder = None;
            tracing::debug!(%waiter, prompt = %activation.prompt.id, "prompt released");
            self.pump();
        }
    }

    /// Stop waiting for an evaluation.
    ///
    /// A queued evaluation is withdrawn. One already sent keeps its
    /// activation busy until the host answers; the answer is discarded.
    pub fn abandon_eval(&mut self, waiter: WaiterId, request_id: RequestId) {
        if let Some(pos) = self.evals.iter().position(|w| w.id == waiter) {
            self.evals.remove(pos);
            return;
        }
        if self.in_flight.remove(&request_id).is_some() {
            tracing::debug!(request = %request_id, "in-flight evaluation abandoned");
        }
    }

    pub fn on_prompt(&mut self, prompt: PromptInfo) {
        let depth = match self.stack.last() {
            None => 0,
            Some(top) if top.evaluating.is_some() => top.depth + 1,
            Some(top) => {
                tracing::warn!(
                    open = %top.prompt.id,
                    new = %prompt.id,
                    "host opened a prompt over an idle one, replacing it"
                );
                let depth = top.depth;
                self.discard_from(self.stack.len() - 1, "the prompt was superseded by the host");
                depth
            }
        };
        tracing::debug!(prompt = %prompt.id, depth, context = ?prompt.context, "prompt opened");
        self.stack.push(Activation {
            prompt,
            depth,
            holder: None,
            evaluating: None,
        });
        self.pump();
    }

    pub fn on_eval_result(&mut self, request_id: RequestId, outcome: EvalOutcome) {
        match self
            .stack
            .iter()
            .rposition(|a| a.evaluating == Some(request_id))
        {
            Some(index) => {
                if index + 1 < self.stack.len() {
                    tracing::warn!(
                        request = %request_id,
                        stale = self.stack.len() - index - 1,
                        "evaluation finished with nested prompts still open"
                    );
                    self.discard_from(index + 1, "the host abandoned the nested prompt");
                }
                self.stack[index].evaluating = None;
            }
            None => {
                tracing::debug!(request = %request_id, "result for an untracked evaluation")
            }
        }
        if let Some((prompt, tx)) = self.in_flight.remove(&request_id) {
            let _ = tx.send(Ok(Evaluated { prompt, outcome }));
        }
        self.pump();
    }

    /// Interrupt the host and fail everything outstanding as canceled.
    pub fn cancel_all(&mut self) {
        if let Some(outbound) = &self.outbound {
            let _ = outbound.send(ClientMessage::Interrupt);
        }
        self.fail_all(SessionError::Canceled);
    }

    fn fail_all(&mut self, err: SessionError) {
        for waiter in self.top_level.drain(..).chain(self.reentrant.drain(..)) {
            let _ = waiter.tx.send(Err(err.clone()));
        }
        for waiter in self.evals.drain(..) {
            let _ = waiter.tx.send(Err(err.clone()));
        }
        for (_, (_, tx)) in self.in_flight.drain() {
            let _ = tx.send(Err(err.clone()));
        }
        for activation in self.stack.drain(..) {
            if let Some(holder) = activation.holder {
                self.revoked.insert(holder, err.clone());
            }
        }
    }

    /// Drop activations from `index` up, failing whatever depended on them.
    fn discard_from(&mut self, index: usize, reason: &str) {
        let removed: Vec<Activation> = self.stack.drain(index..).collect();
        for activation in removed {
            if let Some(holder) = activation.holder {
                self.revoked
                    .insert(holder, SessionError::invalid(reason.to_string()));
            }
            if let Some(request_id) = activation.evaluating {
                if let Some((_, tx)) = self.in_flight.remove(&request_id) {
                    let _ = tx.send(Err(SessionError::Canceled));
                }
            }
            self.fail_pinned(activation.prompt.id, Some(reason));
        }
    }

    fn fail_pinned(&mut self, prompt: PromptId, reason: Option<&str>) {
        let mut kept = VecDeque::with_capacity(self.evals.len());
        for waiter in self.evals.drain(..) {
            if waiter.target == Some(prompt) {
                let err = match reason {
                    Some(reason) => SessionError::invalid(reason.to_string()),
                    None => prompt_closed(prompt),
                };
                let _ = waiter.tx.send(Err(err));
            } else {
                kept.push_back(waiter);
            }
        }
        self.evals = kept;
    }

    fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        match &self.outbound {
            Some(outbound) => outbound.send(msg).map_err(|_| SessionError::Disconnected),
            None => Err(SessionError::Disconnected),
        }
    }

    /// Hand the top activation to whoever may use it next.
    fn pump(&mut self) {
        loop {
            let Some(top) = self.stack.len().checked_sub(1) else {
                return;
            };
            if self.stack[top].evaluating.is_some() {
                return;
            }
            let prompt_id = self.stack[top].prompt.id;

            if let Some(pos) = self
                .evals
                .iter()
                .position(|w| w.target.map_or(true, |t| t == prompt_id))
            {
                let Some(waiter) = self.evals.remove(pos) else {
                    return;
                };
                if waiter.tx.is_closed() {
                    continue;
                }
                let msg = ClientMessage::Evaluate {
                    request_id: waiter.request_id,
                    prompt_id,
                    code: waiter.code,
                };
                if let Err(err) = self.send(msg) {
                    let _ = waiter.tx.send(Err(err));
                    continue;
                }
                tracing::debug!(
                    waiter = %waiter.id,
                    request = %waiter.request_id,
                    prompt = %prompt_id,
                    "evaluation sent"
                );
                self.stack[top].evaluating = Some(waiter.request_id);
                self.in_flight
                    .insert(waiter.request_id, (prompt_id, waiter.tx));
                return;
            }

            if self.stack[top].holder.is_some() {
                return;
            }
            let depth = self.stack[top].depth;
            let next = match self.reentrant.pop_front() {
                Some(waiter) => Some(waiter),
                None if depth == 0 => self.top_level.pop_front(),
                None => None,
            };
            let Some(waiter) = next else {
                return;
            };
            let grant = Grant {
                prompt: self.stack[top].prompt.clone(),
                depth,
            };
            if waiter.tx.send(Ok(grant)).is_ok() {
                tracing::debug!(waiter = %waiter.id, prompt = %prompt_id, depth, "turn granted");
                self.stack[top].holder = Some(waiter.id);
            }
        }
    }
}

fn remove_waiter(queue: &mut VecDeque<HoldWaiter>, id: WaiterId) -> bool {
    match queue.iter().position(|w| w.id == id) {
        Some(pos) => {
            queue.remove(pos);
            true
        }
        None => false,
    }
}

fn prompt_closed(prompt: PromptId) -> SessionError {
    SessionError::invalid(format!("prompt {prompt} is no longer open"))
}

#[cfg(test)]
#[path = "turn_tests.rs"]
mod tests;
