//! Session lifecycle specs

use crate::prelude::*;

#[tokio::test]
async fn only_one_of_many_concurrent_starts_runs() {
    let connector = FakeConnector::with_program(FakeProgram::new());
    connector.hold_starts();
    let provider = provider(connector.clone()).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();

    let starts: Vec<_> = (0..4)
        .map(|_| {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .start_host(startup(), std::sync::Arc::new(NoOpCallbacks), SPEC_WAIT_MAX, None)
                    .await
            })
        })
        .collect();
    within(connector.wait_for_starts(1)).await;
    connector.release_starts();

    let mut ok = 0;
    for start in starts {
        match within(start).await.unwrap() {
            Ok(()) => ok += 1,
            Err(e) => assert!(matches!(e, SessionError::InvalidOperation(_)), "{e:?}"),
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(connector.start_count(), 1);
    assert_eq!(session.state(), SessionState::Running);
}

#[tokio::test]
async fn a_disposed_session_is_replaced_by_a_new_instance() {
    let (provider, session) = running(FakeProgram::new()).await;
    let id = session.id();
    assert_eq!(provider.get_or_create(id).unwrap().instance(), session.instance());

    session.dispose().await;

    let replacement = provider.get_or_create(id).unwrap();
    assert_ne!(replacement.instance(), session.instance());
    assert_eq!(replacement.state(), SessionState::NotStarted);
}

#[tokio::test]
async fn cancel_all_leaves_the_session_usable() {
    let (_provider, session) = running(FakeProgram::new()).await;
    let sleeping = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .evaluate("Sys.sleep(Inf)", Nesting::TopLevel, None)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    session.cancel_all().await;

    assert_eq!(within(sleeping).await.unwrap(), Err(SessionError::Canceled));
    assert!(session.is_host_running());
    within(session.evaluate("x <- 5", Nesting::TopLevel, None))
        .await
        .unwrap();
    let value = within(session.evaluate("x", Nesting::TopLevel, None))
        .await
        .unwrap();
    assert_eq!(value, json!(5));
}

#[tokio::test]
async fn stopping_reports_disconnected_to_later_requests() {
    let (_provider, session) = running(FakeProgram::new()).await;
    session.stop_host().await;

    assert_eq!(session.state(), SessionState::Stopped);
    let err = session
        .evaluate("1", Nesting::TopLevel, None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Disconnected);
}
