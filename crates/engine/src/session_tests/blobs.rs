// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blob channel

use super::*;
use proptest::prelude::*;

#[tokio::test]
async fn destroyed_blob_cannot_be_fetched() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let id = session.create_blob(b"abc".to_vec(), None).await.unwrap();

    session.destroy_blobs(vec![id], None).await.unwrap();

    let err = session.get_blob(id, None).await.unwrap_err();
    assert!(matches!(err, SessionError::Evaluation(_)), "{err:?}");
}

#[tokio::test]
async fn blob_ids_are_not_reused() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let first = session.create_blob(vec![1], None).await.unwrap();
    session.destroy_blobs(vec![first], None).await.unwrap();
    let second = session.create_blob(vec![2], None).await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn blobs_work_while_the_host_is_busy() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let busy = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .evaluate("Sys.sleep(Inf)", Nesting::TopLevel, None)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let id = within(session.create_blob(vec![9, 8, 7], None))
        .await
        .unwrap();
    assert_eq!(session.get_blob(id, None).await.unwrap(), vec![9, 8, 7]);

    session.cancel_all().await;
    assert_eq!(within(busy).await.unwrap(), Err(SessionError::Canceled));
}

#[tokio::test]
async fn blob_requests_need_a_running_host() {
    let provider = provider(FakeConnector::new()).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();

    assert_eq!(
        session.create_blob(vec![1], None).await,
        Err(SessionError::Disconnected)
    );
    assert_eq!(
        session.get_blob(BlobId::new(1), None).await,
        Err(SessionError::Disconnected)
    );
    assert_eq!(
        session.destroy_blobs(vec![BlobId::new(1)], None).await,
        Err(SessionError::Disconnected)
    );
}

#[tokio::test]
async fn disconnect_fails_outstanding_blob_requests_as_disconnected() {
    let ManualSession {
        provider: _provider,
        session,
        mut host,
    } = manual_session().await;
    let create = {
        let session = session.clone();
        tokio::spawn(async move { session.create_blob(vec![1, 2], None).await })
    };
    assert!(matches!(
        host.recv().await,
        Some(ClientMessage::CreateBlob { .. })
    ));

    host.disconnect();

    assert_eq!(within(create).await.unwrap(), Err(SessionError::Disconnected));
}

#[tokio::test]
async fn caller_cancel_is_distinct_from_disconnect() {
    let mut ms = manual_session().await;
    let token = CancellationToken::new();
    let get = {
        let session = ms.session.clone();
        let token = token.clone();
        tokio::spawn(async move { session.get_blob(BlobId::new(4), Some(&token)).await })
    };
    let Some(ClientMessage::GetBlob { request_id, .. }) = ms.host.recv().await else {
        panic!("expected get_blob");
    };

    token.cancel();
    assert_eq!(within(get).await.unwrap(), Err(SessionError::Canceled));

    // the late reply is dropped
    ms.host
        .reply(request_id, ReplyBody::BlobData { data: vec![1] });
    assert!(ms.session.is_host_running());
}

#[tokio::test]
async fn mismatched_reply_is_a_protocol_error() {
    let mut ms = manual_session().await;
    let create = {
        let session = ms.session.clone();
        tokio::spawn(async move { session.create_blob(vec![1], None).await })
    };
    let Some(ClientMessage::CreateBlob { request_id, .. }) = ms.host.recv().await else {
        panic!("expected create_blob");
    };
    ms.host.reply(request_id, ReplyBody::BlobsDestroyed);

    let err = within(create).await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Protocol(_)), "{err:?}");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn blob_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let fetched = rt.block_on(async {
            let (_provider, session) = interpreter_session(FakeProgram::new()).await;
            let id = session.create_blob(data.clone(), None).await.unwrap();
            session.get_blob(id, None).await.unwrap()
        });
        prop_assert_eq!(fetched, data);
    }
}
