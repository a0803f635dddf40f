// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Starting, stopping and disposing the host behind a session.

use super::{dispatch, Core, Live, PauseSignal, ResetGuard, Session, SessionState, StartStatus};
use crate::callbacks::HostCallbacks;
use crate::error::SessionError;
use rh_adapters::HostConnection;
use rh_core::{ClientMessage, DisconnectReason, HostStartupInfo, SessionEvent};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Resolves a start attempt as canceled if its future is dropped mid-way.
struct StartGuard<'a> {
    core: &'a Core,
    epoch: u64,
    armed: bool,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.core.fail_start(self.epoch, SessionError::Canceled);
        }
    }
}

impl Core {
    fn finish_start(self: &Arc<Self>, epoch: u64, conn: HostConnection) -> Result<(), SessionError> {
        let HostConnection {
            outbound,
            inbound,
            guard,
        } = conn;
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || self.state() != SessionState::Starting {
            tracing::debug!(parent: &self.span, "start superseded, dropping connection");
            return Err(SessionError::Canceled);
        }
        inner.start_cancel = None;
        inner.turns.attach(outbound.clone());
        let reader = tokio::spawn(
            dispatch::read_host(self.clone(), epoch, inbound).instrument(self.span.clone()),
        );
        inner.live = Some(Live {
            outbound,
            guard,
            reader,
        });
        self.set_state(SessionState::Running);
        self.started.send_replace(StartStatus::Running);
        self.emit(SessionEvent::Connected {
            instance: self.instance,
        });
        Ok(())
    }

    pub(crate) fn fail_start(&self, epoch: u64, err: SessionError) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || self.state() != SessionState::Starting {
            return;
        }
        inner.start_cancel = None;
        inner.turns.detach(SessionError::Canceled);
        inner.blobs.fail_all(SessionError::Canceled);
        let (state, status) = match &err {
            SessionError::Canceled => (SessionState::Stopped, StartStatus::Failed(err.clone())),
            SessionError::Timeout(_) => (
                SessionState::Stopped,
                StartStatus::Failed(SessionError::Canceled),
            ),
            _ => (SessionState::Faulted, StartStatus::Failed(err.clone())),
        };
        tracing::warn!(parent: &self.span, error = %err, next = %state, "host start failed");
        self.set_state(state);
        self.started.send_replace(status);
    }

    /// The host side closed; tear down unless a stop already did.
    pub(crate) fn on_host_closed(&self, epoch: u64, failure: Option<String>) {
        let live = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch || self.state() != SessionState::Running {
                return;
            }
            inner.epoch += 1;
            let live = inner.live.take();
            inner.turns.detach(SessionError::Disconnected);
            inner.blobs.fail_all(SessionError::Disconnected);
            inner.signal_pause(PauseSignal::Ended);
            let reason = match failure {
                Some(message) => DisconnectReason::TransportFailed { message },
                None => DisconnectReason::HostExited {
                    status: inner.exit_status,
                },
            };
            tracing::warn!(parent: &self.span, %reason, "host disconnected");
            self.set_state(SessionState::Stopped);
            self.started.send_replace(StartStatus::Idle);
            self.emit(SessionEvent::Disconnected {
                reason,
                resetting: self.resetting.load(Ordering::SeqCst) > 0,
            });
            live
        };
        drop(live);
    }
}

impl Session {
    /// Launch the host through the provider's current broker.
    ///
    /// Only one start may be in flight; concurrent calls fail with
    /// `InvalidOperation` without disturbing it.
    pub async fn start_host(
        &self,
        info: HostStartupInfo,
        callbacks: Arc<dyn HostCallbacks>,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SessionError> {
        let core = &self.core;
        let (epoch, stop) = {
            let mut inner = core.inner.lock();
            if core.disposed.load(Ordering::SeqCst) {
                return Err(SessionError::Disposed);
            }
            match core.state() {
                SessionState::NotStarted | SessionState::Stopped => {}
                state => {
                    return Err(SessionError::invalid(format!(
                        "cannot start the host while the session is {state}"
                    )))
                }
            }
            inner.epoch += 1;
            let stop = CancellationToken::new();
            inner.start_cancel = Some(stop.clone());
            inner.callbacks = callbacks.clone();
            inner.last_start = Some((info.clone(), callbacks));
            inner.exit_status = None;
            core.set_state(SessionState::Starting);
            core.started.send_replace(StartStatus::Pending);
            (inner.epoch, stop)
        };

        let mut guard = StartGuard {
            core,
            epoch,
            armed: true,
        };
        let caller = cancel.cloned().unwrap_or_default();
        let started_at = Instant::now();
        let result = async {
            tracing::info!(host = %info.name, interpreter = %info.interpreter.display(), "starting host");
            tokio::select! {
                r = core.launcher.launch(core.id, &info) => r,
                _ = stop.cancelled() => Err(SessionError::Canceled),
                _ = caller.cancelled() => Err(SessionError::Canceled),
                _ = tokio::time::sleep(timeout) => Err(SessionError::Timeout(timeout)),
            }
        }
        .instrument(core.span.clone())
        .await;
        guard.armed = false;

        let result = match result {
            Ok(conn) => core.finish_start(epoch, conn),
            Err(err) => Err(err),
        };
        match &result {
            Ok(()) => tracing::info!(
                parent: &core.span,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "host running"
            ),
            Err(err) => core.fail_start(epoch, err.clone()),
        }
        result
    }

    /// Like [`start_host`](Self::start_host) but succeeds at once when the
    /// host is running and joins a start already in flight.
    pub async fn ensure_host_started(
        &self,
        info: HostStartupInfo,
        callbacks: Arc<dyn HostCallbacks>,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SessionError> {
        loop {
            match self.state() {
                SessionState::Running => return Ok(()),
                SessionState::Starting => return self.wait_started(cancel).await,
                _ => {
                    match self
                        .start_host(info.clone(), callbacks.clone(), timeout, cancel)
                        .await
                    {
                        Err(SessionError::InvalidOperation(_))
                            if matches!(
                                self.state(),
                                SessionState::Starting | SessionState::Running
                            ) =>
                        {
                            continue
                        }
                        other => return other,
                    }
                }
            }
        }
    }

    /// Resolves when the current start attempt finishes.
    pub async fn host_started(&self) -> Result<(), SessionError> {
        self.wait_started(None).await
    }

    async fn wait_started(&self, cancel: Option<&CancellationToken>) -> Result<(), SessionError> {
        let mut rx = self.core.started.subscribe();
        let waited = async {
            rx.wait_for(|s| *s != StartStatus::Pending)
                .await
                .map(|s| (*s).clone())
                .map_err(|_| SessionError::Disposed)
        };
        let status = match cancel {
            Some(token) => tokio::select! {
                s = waited => s?,
                _ = token.cancelled() => return Err(SessionError::Canceled),
            },
            None => waited.await?,
        };
        match status {
            StartStatus::Running => Ok(()),
            StartStatus::Failed(err) => Err(err),
            StartStatus::Idle | StartStatus::Pending => Err(SessionError::Disconnected),
        }
    }

    /// Stop the host. Idempotent.
    ///
    /// Outstanding requests fail as canceled, outstanding blob requests as
    /// disconnected. A start in flight is canceled.
    pub async fn stop_host(&self) {
        let core = &self.core;
        let _resetting = ResetGuard::new(&core.resetting);
        let live = {
            let mut inner = core.inner.lock();
            match core.state() {
                SessionState::Stopped => return,
                SessionState::Stopping => None,
                SessionState::NotStarted | SessionState::Faulted => {
                    core.set_state(SessionState::Stopped);
                    core.started.send_replace(StartStatus::Idle);
                    return;
                }
                SessionState::Starting => {
                    inner.epoch += 1;
                    if let Some(token) = inner.start_cancel.take() {
                        token.cancel();
                    }
                    inner.turns.detach(SessionError::Canceled);
                    inner.blobs.fail_all(SessionError::Canceled);
                    tracing::info!(parent: &core.span, "start canceled by stop");
                    core.set_state(SessionState::Stopped);
                    core.started
                        .send_replace(StartStatus::Failed(SessionError::Canceled));
                    return;
                }
                SessionState::Running => {
                    inner.epoch += 1;
                    inner.turns.detach(SessionError::Canceled);
                    inner.blobs.fail_all(SessionError::Disconnected);
                    inner.signal_pause(PauseSignal::Ended);
                    core.set_state(SessionState::Stopping);
                    inner.live.take()
                }
            }
        };

        let Some(live) = live else {
            // another caller is stopping; wait for it
            let mut state = core.state.subscribe();
            let _ = state.wait_for(|s| *s != SessionState::Stopping).await;
            return;
        };

        tracing::info!(parent: &core.span, "stopping host");
        let Live {
            outbound,
            guard,
            reader,
        } = live;
        let _ = outbound.send(ClientMessage::Shutdown);
        drop(outbound);
        let abort = reader.abort_handle();
        if tokio::time::timeout(core.options.stop_grace, reader)
            .await
            .is_err()
        {
            tracing::warn!(
                parent: &core.span,
                grace_ms = core.options.stop_grace.as_millis() as u64,
                "host did not exit in time, closing connection"
            );
        }
        abort.abort();
        drop(guard);

        let _inner = core.inner.lock();
        core.set_state(SessionState::Stopped);
        core.started.send_replace(StartStatus::Idle);
        core.emit(SessionEvent::Disconnected {
            reason: DisconnectReason::Requested,
            resetting: true,
        });
        tracing::info!(parent: &core.span, "host stopped");
    }

    /// Stop, then start again with the last startup descriptor and callbacks.
    pub async fn restart_host(
        &self,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), SessionError> {
        let Some((info, callbacks)) = self.core.inner.lock().last_start.clone() else {
            return Err(SessionError::invalid("the host has never been started"));
        };
        let _resetting = ResetGuard::new(&self.core.resetting);
        self.stop_host().await;
        self.start_host(info, callbacks, timeout, cancel).await
    }

    /// Stop the host and drop this session from its provider.
    ///
    /// Later `start_host` calls fail with `Disposed`. The provider entry is
    /// removed only while it still refers to this instance.
    pub async fn dispose(&self) {
        if self.core.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_host().await;
        if let Some(registry) = self.core.registry.upgrade() {
            registry.remove(self.core.id, self.core.instance);
        }
        tracing::info!(parent: &self.core.span, "session disposed");
    }
}
