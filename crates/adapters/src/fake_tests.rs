// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rh_core::{ClientMessage, HostMessage, PromptContext};

fn info() -> HostStartupInfo {
    HostStartupInfo::new("console", "/opt/R")
}

#[tokio::test]
async fn connect_records_calls_per_target() {
    let fake = FakeConnector::new();
    fake.connect(&BrokerTarget::new("a")).await.unwrap();
    fake.connect(&BrokerTarget::new("a")).await.unwrap();
    fake.connect(&BrokerTarget::new("b")).await.unwrap();

    assert_eq!(fake.connect_count("a"), 2);
    assert_eq!(fake.connect_count("b"), 1);
    assert_eq!(fake.calls().len(), 3);
}

#[tokio::test]
async fn failing_target_is_unreachable() {
    let fake = FakeConnector::new();
    fake.fail_target("down");
    let err = fake.connect(&BrokerTarget::new("down")).await.err().unwrap();
    assert!(matches!(err, BrokerError::Unreachable(_)));
}

#[tokio::test]
async fn held_target_blocks_until_released() {
    let fake = FakeConnector::new();
    fake.hold_target("slow");
    let pending = tokio::spawn({
        let fake = fake.clone();
        async move { fake.connect(&BrokerTarget::new("slow")).await.is_ok() }
    });
    fake.wait_for_connects("slow", 1).await;
    assert!(!pending.is_finished());

    fake.release_target("slow");
    assert!(pending.await.unwrap());
}

#[tokio::test]
async fn manual_host_exchanges_messages() {
    let fake = FakeConnector::new();
    let broker = fake.connect(&BrokerTarget::local()).await.unwrap();
    let session = SessionId::from_u128(9);
    let mut conn = broker.start_host(session, &info()).await.unwrap();
    let mut host = fake.next_host().await.unwrap();
    assert_eq!(host.session, session);
    assert_eq!(host.broker, "local");

    let id = host.prompt(PromptContext::Normal);
    match conn.inbound.recv().await.unwrap().unwrap() {
        HostMessage::Prompt(p) => assert_eq!(p.id, id),
        other => panic!("unexpected {other:?}"),
    }

    conn.outbound
        .send(ClientMessage::Respond {
            prompt_id: id,
            text: "1".to_string(),
        })
        .unwrap();
    assert_eq!(host.recv_respond().await, Some((id, "1".to_string())));
}

#[tokio::test]
async fn manual_host_failure_and_disconnect() {
    let fake = FakeConnector::new();
    let broker = fake.connect(&BrokerTarget::local()).await.unwrap();
    let mut conn = broker.start_host(SessionId::new_v4(), &info()).await.unwrap();
    let mut host = fake.next_host().await.unwrap();

    host.fail("pipe broke");
    assert!(conn.inbound.recv().await.unwrap().is_err());
    assert!(conn.inbound.recv().await.is_none());
    assert!(!host.send(HostMessage::Exiting { status: 0 }));
}

#[tokio::test]
async fn missing_interpreter_and_start_failures() {
    let fake = FakeConnector::new();
    let broker = fake.connect(&BrokerTarget::local()).await.unwrap();

    fake.set_missing_interpreter("/opt/R");
    let err = broker.start_host(SessionId::new_v4(), &info()).await.err().unwrap();
    assert!(matches!(err, BrokerError::HostMissing(_)));

    let other = HostStartupInfo::new("console", "/usr/lib/R");
    fake.fail_starts("no memory");
    let err = broker.start_host(SessionId::new_v4(), &other).await.err().unwrap();
    assert!(matches!(err, BrokerError::SpawnFailed(m) if m == "no memory"));
    assert_eq!(fake.start_count(), 2);
}

#[tokio::test]
async fn held_starts_are_recorded_before_blocking() {
    let fake = FakeConnector::new();
    fake.hold_starts();
    let broker = fake.connect(&BrokerTarget::local()).await.unwrap();
    let pending = tokio::spawn(async move {
        broker
            .start_host(SessionId::new_v4(), &info())
            .await
            .is_ok()
    });
    fake.wait_for_starts(1).await;
    assert!(!pending.is_finished());

    fake.release_starts();
    assert!(pending.await.unwrap());
    assert_eq!(fake.started_on(), vec!["local".to_string()]);
}

#[tokio::test]
async fn interpreter_mode_runs_a_program() {
    let fake = FakeConnector::with_program(FakeProgram::new());
    let broker = fake.connect(&BrokerTarget::local()).await.unwrap();
    let mut conn = broker.start_host(SessionId::new_v4(), &info()).await.unwrap();

    match conn.inbound.recv().await.unwrap().unwrap() {
        HostMessage::Prompt(p) => assert_eq!(p.context, PromptContext::Normal),
        other => panic!("unexpected {other:?}"),
    }
}
