// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start, stop, restart and disposal

use super::*;

async fn idle_session() -> (SessionProvider<FakeConnector>, Session) {
    let provider = provider(FakeConnector::new()).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();
    (provider, session)
}

fn spawn_start(session: &Session) -> tokio::task::JoinHandle<Result<(), SessionError>> {
    let session = session.clone();
    tokio::spawn(async move {
        session
            .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
            .await
    })
}

#[tokio::test]
async fn new_session_is_not_started() {
    let (_provider, session) = idle_session().await;
    assert_eq!(session.state(), SessionState::NotStarted);
    assert!(!session.is_host_running());
    assert!(!session.is_resetting());
}

#[tokio::test]
async fn concurrent_starts_admit_exactly_one() {
    let (provider, session) = idle_session().await;
    provider.connector().hold_starts();

    let first = spawn_start(&session);
    provider.connector().wait_for_starts(1).await;
    assert_eq!(session.state(), SessionState::Starting);

    for _ in 0..3 {
        let err = session
            .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidOperation(_)), "{err:?}");
    }

    provider.connector().release_starts();
    within(first).await.unwrap().unwrap();
    within(session.host_started()).await.unwrap();
    assert!(session.is_host_running());
    assert_eq!(provider.connector().start_count(), 1);
}

#[tokio::test]
async fn start_emits_connected_with_instance() {
    let (_provider, session) = idle_session().await;
    let mut events = session.subscribe();
    session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap();
    let event = next_event(&mut events, |_| true).await;
    assert_eq!(
        event,
        SessionEvent::Connected {
            instance: session.instance()
        }
    );
}

#[tokio::test]
async fn missing_interpreter_faults_without_disconnect_event() {
    let (provider, session) = idle_session().await;
    provider
        .connector()
        .set_missing_interpreter(startup().interpreter);
    let mut events = session.subscribe();

    let err = session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::HostMissing(_)), "{err:?}");
    assert_eq!(session.state(), SessionState::Faulted);
    assert_eq!(session.host_started().await, Err(err));
    assert!(events.try_recv().is_err());

    // faulted until stopped
    let again = session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await;
    assert!(matches!(again, Err(SessionError::InvalidOperation(_))));
    session.stop_host().await;
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn launch_failure_faults() {
    let (provider, session) = idle_session().await;
    provider.connector().fail_starts("permission denied");
    let err = session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Broker(_)), "{err:?}");
    assert_eq!(session.state(), SessionState::Faulted);
}

#[tokio::test]
async fn start_without_broker_faults() {
    let provider = SessionProvider::with_options(FakeConnector::new(), options());
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();
    let err = session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::NoBroker);
    assert_eq!(session.state(), SessionState::Faulted);
}

#[tokio::test]
async fn start_timeout_resolves_started_as_canceled() {
    let (provider, session) = idle_session().await;
    provider.connector().hold_starts();

    let err = session
        .start_host(
            startup(),
            Arc::new(NoOpCallbacks),
            Duration::from_millis(50),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::Timeout(Duration::from_millis(50)));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.host_started().await, Err(SessionError::Canceled));
}

#[tokio::test]
async fn stop_during_start_cancels_it() {
    let (provider, session) = idle_session().await;
    provider.connector().hold_starts();
    let start = spawn_start(&session);
    provider.connector().wait_for_starts(1).await;

    within(session.stop_host()).await;

    assert_eq!(within(start).await.unwrap(), Err(SessionError::Canceled));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.host_started().await, Err(SessionError::Canceled));
}

#[tokio::test]
async fn caller_token_cancels_start() {
    let (provider, session) = idle_session().await;
    provider.connector().hold_starts();
    let token = CancellationToken::new();
    let start = {
        let session = session.clone();
        let token = token.clone();
        tokio::spawn(async move {
            session
                .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, Some(&token))
                .await
        })
    };
    provider.connector().wait_for_starts(1).await;
    token.cancel();

    assert_eq!(within(start).await.unwrap(), Err(SessionError::Canceled));
    assert_eq!(session.state(), SessionState::Stopped);

    // a later start goes through
    provider.connector().release_starts();
    session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap();
    assert!(session.is_host_running());
}

#[tokio::test]
async fn ensure_joins_start_in_flight() {
    let (provider, session) = idle_session().await;
    provider.connector().hold_starts();
    let start = spawn_start(&session);
    provider.connector().wait_for_starts(1).await;

    let ensure = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .ensure_host_started(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
                .await
        })
    };
    provider.connector().release_starts();

    within(start).await.unwrap().unwrap();
    within(ensure).await.unwrap().unwrap();
    assert_eq!(provider.connector().start_count(), 1);
}

#[tokio::test]
async fn ensure_on_running_session_does_not_restart() {
    let ms = manual_session().await;
    ms.session
        .ensure_host_started(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap();
    assert_eq!(ms.connector().start_count(), 1);
}

#[tokio::test]
async fn ensure_starts_a_stopped_session() {
    let (provider, session) = idle_session().await;
    session
        .ensure_host_started(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap();
    assert!(session.is_host_running());
    assert_eq!(provider.connector().start_count(), 1);
}

#[tokio::test]
async fn stop_sends_shutdown_and_reports_requested() {
    let ManualSession {
        provider: _provider,
        session,
        mut host,
    } = manual_session().await;
    let mut events = session.subscribe();

    let stop = {
        let session = session.clone();
        tokio::spawn(async move { session.stop_host().await })
    };
    assert_eq!(host.recv().await, Some(ClientMessage::Shutdown));
    host.exit(0);
    within(stop).await.unwrap();

    assert_eq!(session.state(), SessionState::Stopped);
    let event = next_event(&mut events, |e| {
        matches!(e, SessionEvent::Disconnected { .. })
    })
    .await;
    assert_eq!(
        event,
        SessionEvent::Disconnected {
            reason: DisconnectReason::Requested,
            resetting: true,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn observers_see_their_own_stop_as_a_reset() {
    let ManualSession {
        provider: _provider,
        session,
        mut host,
    } = manual_session().await;
    let mut events = session.subscribe();
    let observer = tokio::spawn(async move {
        loop {
            if let Ok(SessionEvent::Disconnected { resetting, .. }) = events.recv().await {
                return resetting;
            }
        }
    });

    let stop = {
        let session = session.clone();
        tokio::spawn(async move { session.stop_host().await })
    };
    assert_eq!(host.recv().await, Some(ClientMessage::Shutdown));
    assert!(session.is_resetting());
    host.exit(0);
    within(stop).await.unwrap();

    assert!(within(observer).await.unwrap());
    assert!(!session.is_resetting());
}

#[tokio::test]
async fn restart_marks_its_disconnect_as_a_reset() {
    let ms = manual_session().await;
    let mut events = ms.session.subscribe();

    within(ms.session.restart_host(TIMEOUT, None)).await.unwrap();

    let event = next_event(&mut events, |e| {
        matches!(e, SessionEvent::Disconnected { .. })
    })
    .await;
    assert!(matches!(
        event,
        SessionEvent::Disconnected {
            resetting: true,
            ..
        }
    ));
}

#[tokio::test]
async fn stop_gives_up_on_a_host_that_ignores_shutdown() {
    let ms = manual_session().await;
    within(ms.session.stop_host()).await;
    assert_eq!(ms.session.state(), SessionState::Stopped);
    // idempotent
    within(ms.session.stop_host()).await;
    assert_eq!(ms.session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn stop_fails_outstanding_interactions_as_canceled() {
    let ms = manual_session().await;
    let turn = ms.session.queue_interaction(Nesting::TopLevel).unwrap();
    let pending = tokio::spawn(async move { turn.wait(None).await.map(|_| ()) });
    within(ms.session.stop_host()).await;
    assert_eq!(within(pending).await.unwrap(), Err(SessionError::Canceled));
}

#[tokio::test]
async fn host_exit_disconnects_with_status() {
    let ManualSession {
        provider: _provider,
        session,
        mut host,
    } = manual_session().await;
    let mut events = session.subscribe();
    let turn = session.queue_interaction(Nesting::TopLevel).unwrap();
    let pending = tokio::spawn(async move { turn.wait(None).await.map(|_| ()) });

    host.exit(3);

    let event = next_event(&mut events, |e| {
        matches!(e, SessionEvent::Disconnected { .. })
    })
    .await;
    assert_eq!(
        event,
        SessionEvent::Disconnected {
            reason: DisconnectReason::HostExited { status: Some(3) },
            resetting: false,
        }
    );
    assert_eq!(within(pending).await.unwrap(), Err(SessionError::Disconnected));
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn transport_failure_disconnects() {
    let ManualSession {
        provider: _provider,
        session,
        mut host,
    } = manual_session().await;
    let mut events = session.subscribe();

    host.fail("connection reset");

    let event = next_event(&mut events, |e| {
        matches!(e, SessionEvent::Disconnected { .. })
    })
    .await;
    let SessionEvent::Disconnected {
        reason: DisconnectReason::TransportFailed { message },
        resetting: false,
    } = event
    else {
        panic!("unexpected {event:?}");
    };
    assert!(message.contains("connection reset"), "{message}");
    assert!(!session.is_host_running());
}

#[tokio::test]
async fn restart_reuses_startup_descriptor() {
    let ms = manual_session().await;
    let instance = ms.session.instance();

    within(ms.session.restart_host(TIMEOUT, None)).await.unwrap();

    assert!(ms.session.is_host_running());
    assert!(!ms.session.is_resetting());
    assert_eq!(ms.session.instance(), instance);
    assert_eq!(ms.connector().start_count(), 2);
    let host = ms.connector().next_host().await.unwrap();
    assert_eq!(host.info, startup());
}

#[tokio::test]
async fn restart_before_any_start_is_invalid() {
    let (_provider, session) = idle_session().await;
    let err = session.restart_host(TIMEOUT, None).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidOperation(_)));
}

#[tokio::test]
async fn dispose_rejects_start_and_leaves_registry() {
    let ms = manual_session().await;
    let id = ms.session.id();

    within(ms.session.dispose()).await;

    assert!(ms.session.is_disposed());
    assert!(ms.provider.get(id).is_none());
    let err = ms
        .session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Disposed);
}

#[tokio::test]
async fn state_watch_sees_transitions() {
    let (_provider, session) = idle_session().await;
    let mut states = session.watch_state();
    session
        .start_host(startup(), Arc::new(NoOpCallbacks), TIMEOUT, None)
        .await
        .unwrap();
    within(states.wait_for(|s| *s == SessionState::Running))
        .await
        .unwrap();
    session.stop_host().await;
    within(states.wait_for(|s| *s == SessionState::Stopped))
        .await
        .unwrap();
}
