// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One logical session with a host interpreter.
//!
//! A [`Session`] owns the host connection, the turn manager and the blob
//! table. It is a cheap handle; clones share the same record.

mod dispatch;
mod lifecycle;

use crate::blobs::{BlobRequest, BlobTable};
use crate::broker_slot::HostLauncher;
use crate::callbacks::{HostCallbacks, NoOpCallbacks};
use crate::env;
use crate::error::SessionError;
use crate::interaction::{EvaluationScope, Interaction, PendingTurn};
use crate::provider::Registry;
use crate::turn::{Evaluated, Nesting, Pending, TurnManager, WaiterId};
use parking_lot::Mutex;
use rh_adapters::ConnectionGuard;
use rh_core::{
    BlobId, ClientMessage, EvalOutcome, HostStartupInfo, InstanceId, PromptId, PromptInfo,
    ReplyBody, RequestId, SessionEvent, SessionId, Sequence,
};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a session's host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    NotStarted,
    Starting,
    Running,
    Stopping,
    Stopped,
    /// Start failed; only `stop_host` leaves this state
    Faulted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::NotStarted => "not_started",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Timeout used by `restart_host` and the CLI when none is given
    pub start_timeout: Duration,
    /// How long `stop_host` waits for the host to exit on its own
    pub stop_grace: Duration,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            start_timeout: env::start_timeout(),
            stop_grace: env::stop_grace(),
            event_capacity: env::event_capacity(),
        }
    }
}

/// Outcome of the most recent start attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StartStatus {
    Idle,
    Pending,
    Running,
    Failed(SessionError),
}

/// Browser prompt activity, in host order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PauseSignal {
    /// A `browse` prompt opened
    Opened(PromptInfo),
    /// A prompt was answered with `text`
    Answered { prompt: PromptId, text: String },
    /// A non-browser prompt opened or the connection went away
    Ended,
}

/// The live host connection.
pub(crate) struct Live {
    pub(crate) outbound: mpsc::UnboundedSender<ClientMessage>,
    pub(crate) guard: ConnectionGuard,
    pub(crate) reader: JoinHandle<()>,
}

pub(crate) struct Inner {
    pub(crate) turns: TurnManager,
    pub(crate) blobs: BlobTable,
    pub(crate) live: Option<Live>,
    /// Bumped whenever a connection attempt or connection is superseded
    pub(crate) epoch: u64,
    pub(crate) start_cancel: Option<CancellationToken>,
    pub(crate) callbacks: Arc<dyn HostCallbacks>,
    pub(crate) last_start: Option<(HostStartupInfo, Arc<dyn HostCallbacks>)>,
    pub(crate) exit_status: Option<i32>,
    pub(crate) pause_watchers: Vec<mpsc::UnboundedSender<PauseSignal>>,
}

impl Inner {
    pub(crate) fn signal_pause(&mut self, signal: PauseSignal) {
        self.pause_watchers.retain(|watcher| watcher.send(signal.clone()).is_ok());
    }
}

pub(crate) struct Core {
    pub(crate) id: SessionId,
    pub(crate) instance: InstanceId,
    pub(crate) span: tracing::Span,
    pub(crate) launcher: Arc<dyn HostLauncher>,
    pub(crate) registry: Weak<Registry>,
    pub(crate) options: SessionOptions,
    pub(crate) inner: Mutex<Inner>,
    pub(crate) state: watch::Sender<SessionState>,
    pub(crate) started: watch::Sender<StartStatus>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) requests: Sequence,
    pub(crate) resetting: AtomicUsize,
    pub(crate) disposed: AtomicBool,
}

impl Core {
    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Callers hold the `inner` lock so transitions stay ordered with it.
    pub(crate) fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(parent: &self.span, from = %previous, to = %state, "state changed");
        }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn require_connected(&self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Starting | SessionState::Running => Ok(()),
            _ => Err(SessionError::Disconnected),
        }
    }

    pub(crate) fn release(&self, waiter: WaiterId) {
        self.inner.lock().turns.release(waiter);
    }
}

/// Marks a session as resetting while alive.
pub(crate) struct ResetGuard<'a>(&'a AtomicUsize);

impl<'a> ResetGuard<'a> {
    pub(crate) fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Withdraws an evaluation whose caller stopped waiting.
struct EvalGuard<'a> {
    core: &'a Core,
    waiter: WaiterId,
    request_id: RequestId,
}

impl Drop for EvalGuard<'_> {
    fn drop(&mut self) {
        self.core
            .inner
            .lock()
            .turns
            .abandon_eval(self.waiter, self.request_id);
    }
}

/// Withdraws a blob request whose caller stopped waiting.
struct BlobGuard<'a> {
    core: &'a Core,
    request_id: RequestId,
}

impl Drop for BlobGuard<'_> {
    fn drop(&mut self) {
        self.core.inner.lock().blobs.abandon(self.request_id);
    }
}

/// Await a reply, failing with `Canceled` if the token fires first.
pub(crate) async fn settle<T>(
    rx: Pending<T>,
    cancel: Option<&CancellationToken>,
) -> Result<T, SessionError> {
    let received = match cancel {
        Some(token) => tokio::select! {
            r = rx => r,
            _ = token.cancelled() => return Err(SessionError::Canceled),
        },
        None => rx.await,
    };
    received.unwrap_or(Err(SessionError::Disconnected))
}

pub(crate) fn outcome_value(outcome: EvalOutcome) -> Result<Value, SessionError> {
    match outcome {
        EvalOutcome::Ok { value } => Ok(value),
        EvalOutcome::Error { message } => Err(SessionError::Evaluation(message)),
        EvalOutcome::Canceled => Err(SessionError::Canceled),
    }
}

/// Run one evaluation on behalf of a turn holder (or borrowed, when
/// `holder` is `None`) and wait for its result.
pub(crate) async fn evaluate_with(
    core: &Core,
    holder: Option<WaiterId>,
    target: Option<PromptId>,
    code: &str,
    cancel: Option<&CancellationToken>,
) -> Result<Evaluated, SessionError> {
    let request_id = core.requests.next_request();
    let (waiter, rx) = {
        let mut inner = core.inner.lock();
        match holder {
            Some(holder) => inner.turns.eval_as(holder, request_id, code.to_string())?,
            None => inner.turns.eval(target, request_id, code.to_string()),
        }
    };
    let _guard = EvalGuard {
        core,
        waiter,
        request_id,
    };
    settle(rx, cancel).await
}

#[derive(Clone)]
pub struct Session {
    pub(crate) core: Arc<Core>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("instance", &self.core.instance)
            .field("state", &self.core.state())
            .finish()
    }
}

impl Session {
    pub(crate) fn new(
        id: SessionId,
        launcher: Arc<dyn HostLauncher>,
        registry: Weak<Registry>,
        options: SessionOptions,
    ) -> Self {
        let instance = InstanceId::next();
        let span = tracing::info_span!("session", session_id = %id.short(8), %instance);
        let (events, _) = broadcast::channel(options.event_capacity);
        let (state, _) = watch::channel(SessionState::NotStarted);
        let (started, _) = watch::channel(StartStatus::Idle);
        let core = Core {
            id,
            instance,
            span,
            launcher,
            registry,
            options,
            inner: Mutex::new(Inner {
                turns: TurnManager::new(),
                blobs: BlobTable::new(),
                live: None,
                epoch: 0,
                start_cancel: None,
                callbacks: Arc::new(NoOpCallbacks),
                last_start: None,
                exit_status: None,
                pause_watchers: Vec::new(),
            }),
            state,
            started,
            events,
            requests: Sequence::new(),
            resetting: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        };
        Self {
            core: Arc::new(core),
        }
    }

    pub fn id(&self) -> SessionId {
        self.core.id
    }

    /// Identity of this session record; a session created after disposal
    /// of one with the same id gets a different instance.
    pub fn instance(&self) -> InstanceId {
        self.core.instance
    }

    pub fn state(&self) -> SessionState {
        self.core.state()
    }

    /// A hint: the state may change right after the call returns.
    pub fn is_host_running(&self) -> bool {
        self.core.state() == SessionState::Running
    }

    /// True while the caller's own stop or restart is in progress.
    pub fn is_resetting(&self) -> bool {
        self.core.resetting.load(Ordering::SeqCst) > 0
    }

    pub fn is_disposed(&self) -> bool {
        self.core.disposed.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.core.options
    }

    /// Subscribe to output, prompt and connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.core.events.subscribe()
    }

    /// Unbounded feed of browser prompt activity for the debug overlay.
    pub(crate) fn watch_pauses(&self) -> mpsc::UnboundedReceiver<PauseSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.core.inner.lock().pause_watchers.push(tx);
        rx
    }

    /// Watch lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.core.state.subscribe()
    }

    /// Queue a request for a prompt; it is admitted in arrival order.
    pub fn queue_interaction(&self, nesting: Nesting) -> Result<PendingTurn, SessionError> {
        self.core.require_connected()?;
        let (waiter, rx) = self.core.inner.lock().turns.hold(nesting);
        Ok(PendingTurn::new(self.core.clone(), waiter, rx))
    }

    /// Wait for exclusive use of a prompt to answer it.
    pub async fn begin_interaction(
        &self,
        nesting: Nesting,
        cancel: Option<&CancellationToken>,
    ) -> Result<Interaction, SessionError> {
        self.queue_interaction(nesting)?.wait(cancel).await
    }

    /// Wait for exclusive use of a prompt to run evaluations at.
    pub async fn begin_evaluation(
        &self,
        nesting: Nesting,
        cancel: Option<&CancellationToken>,
    ) -> Result<EvaluationScope, SessionError> {
        let turn = self.queue_interaction(nesting)?.wait(cancel).await?;
        Ok(EvaluationScope::from(turn))
    }

    /// Evaluate code and return its value.
    ///
    /// `TopLevel` waits its turn like an interaction. `Reentrant` runs at the
    /// innermost open prompt as soon as no other evaluation is running
    /// there, even while another request holds that prompt.
    pub async fn evaluate(
        &self,
        code: &str,
        nesting: Nesting,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, SessionError> {
        match nesting {
            Nesting::TopLevel => {
                let scope = self.begin_evaluation(Nesting::TopLevel, cancel).await?;
                scope.evaluate(code, cancel).await
            }
            Nesting::Reentrant => {
                self.core.require_connected()?;
                let evaluated = evaluate_with(&self.core, None, None, code, cancel).await?;
                outcome_value(evaluated.outcome)
            }
        }
    }

    /// Evaluate at one specific open prompt; fails if that prompt closes first.
    pub(crate) async fn evaluate_at(
        &self,
        prompt: PromptId,
        code: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, SessionError> {
        self.core.require_connected()?;
        let evaluated = evaluate_with(&self.core, None, Some(prompt), code, cancel).await?;
        outcome_value(evaluated.outcome)
    }

    /// Interrupt the host and fail every outstanding request as canceled.
    /// The connection stays up.
    pub async fn cancel_all(&self) {
        let mut inner = self.core.inner.lock();
        tracing::info!(parent: &self.core.span, waiting = inner.turns.waiting(), "canceling all requests");
        inner.turns.cancel_all();
    }

    pub async fn create_blob(
        &self,
        data: Vec<u8>,
        cancel: Option<&CancellationToken>,
    ) -> Result<BlobId, SessionError> {
        let body = self
            .blob_request(
                BlobRequest::Create,
                |request_id| ClientMessage::CreateBlob { request_id, data },
                cancel,
            )
            .await?;
        match body {
            ReplyBody::BlobCreated { blob_id } => Ok(blob_id),
            other => Err(SessionError::Protocol(format!(
                "unexpected reply to create_blob: {other:?}"
            ))),
        }
    }

    pub async fn get_blob(
        &self,
        blob_id: BlobId,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<u8>, SessionError> {
        let body = self
            .blob_request(
                BlobRequest::Get(blob_id),
                |request_id| ClientMessage::GetBlob {
                    request_id,
                    blob_id,
                },
                cancel,
            )
            .await?;
        match body {
            ReplyBody::BlobData { data } => Ok(data),
            other => Err(SessionError::Protocol(format!(
                "unexpected reply to get_blob: {other:?}"
            ))),
        }
    }

    pub async fn destroy_blobs(
        &self,
        blob_ids: Vec<BlobId>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SessionError> {
        self.blob_request(
            BlobRequest::Destroy(blob_ids.clone()),
            |request_id| ClientMessage::DestroyBlobs {
                request_id,
                blob_ids,
            },
            cancel,
        )
        .await
        .map(|_| ())
    }

    async fn blob_request(
        &self,
        request: BlobRequest,
        message: impl FnOnce(RequestId) -> ClientMessage,
        cancel: Option<&CancellationToken>,
    ) -> Result<ReplyBody, SessionError> {
        let request_id = self.core.requests.next_request();
        let rx = {
            let mut inner = self.core.inner.lock();
            if self.core.state() != SessionState::Running {
                return Err(SessionError::Disconnected);
            }
            let rx = inner.blobs.register(request_id, request);
            let sent = inner
                .live
                .as_ref()
                .is_some_and(|live| live.outbound.send(message(request_id)).is_ok());
            if !sent {
                inner.blobs.abandon(request_id);
                return Err(SessionError::Disconnected);
            }
            rx
        };
        let _guard = BlobGuard {
            core: &self.core,
            request_id,
        };
        settle(rx, cancel).await
    }
}

#[cfg(test)]
#[path = "../session_tests/mod.rs"]
mod tests;
