// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host callbacks served while evaluations run

use super::*;
use crate::RecordingCallbacks;
use rh_adapters::fake::PLOT_MAGIC;
use rh_core::HostCallback;

async fn session_with(callbacks: RecordingCallbacks) -> (SessionProvider<FakeConnector>, Session) {
    let provider = provider(FakeConnector::with_program(FakeProgram::new())).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();
    session
        .start_host(startup(), Arc::new(callbacks), TIMEOUT, None)
        .await
        .unwrap();
    (provider, session)
}

#[tokio::test]
async fn read_user_input_is_answered_by_callbacks() {
    let callbacks = RecordingCallbacks::new();
    callbacks.push_input("alice");
    let (_provider, session) = session_with(callbacks.clone()).await;

    let value = within(session.evaluate(
        "rhost:::read_user_input('name? ')",
        Nesting::TopLevel,
        None,
    ))
    .await
    .unwrap();

    assert_eq!(value, json!("alice"));
    assert_eq!(
        callbacks.calls(),
        vec![HostCallback::ReadUserInput {
            prompt: "name? ".to_string(),
            max_length: 0
        }]
    );
}

#[tokio::test]
async fn show_message_is_acknowledged() {
    let callbacks = RecordingCallbacks::new();
    let (_provider, session) = session_with(callbacks.clone()).await;

    within(session.evaluate("rhost:::show_message('hi')", Nesting::TopLevel, None))
        .await
        .unwrap();

    assert_eq!(
        callbacks.calls(),
        vec![HostCallback::ShowMessage {
            message: "hi".to_string()
        }]
    );
}

#[tokio::test]
async fn plot_blob_can_be_fetched() {
    let callbacks = RecordingCallbacks::new();
    let (_provider, session) = session_with(callbacks.clone()).await;

    within(session.evaluate("plot(1, 2)", Nesting::TopLevel, None))
        .await
        .unwrap();

    let blob_id = match callbacks.calls().as_slice() {
        [HostCallback::Plot { blob_id }] => *blob_id,
        other => panic!("expected one plot, got {other:?}"),
    };
    let data = session.get_blob(blob_id, None).await.unwrap();
    assert!(data.starts_with(PLOT_MAGIC));
}

#[tokio::test]
async fn locator_returns_the_picked_point() {
    let callbacks = RecordingCallbacks::new();
    callbacks.set_locator(Some(rh_core::LocatorPoint { x: 1.5, y: 2.0 }));
    let (_provider, session) = session_with(callbacks).await;

    let value = within(session.evaluate("rhost:::locator()", Nesting::TopLevel, None))
        .await
        .unwrap();
    assert_eq!(value, json!({"x": 1.5, "y": 2.0}));
}

#[tokio::test]
async fn default_callbacks_answer_empty_input() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let value = within(session.evaluate(
        "rhost:::read_user_input('name? ')",
        Nesting::TopLevel,
        None,
    ))
    .await
    .unwrap();
    assert_eq!(value, json!(""));
}
