//! Blob channel specs

use crate::prelude::*;

#[tokio::test]
async fn blobs_round_trip_byte_for_byte() {
    let (_provider, session) = running(FakeProgram::new()).await;
    let payloads: Vec<Vec<u8>> = vec![
        Vec::new(),
        b"hello".to_vec(),
        (0..=255).collect(),
        vec![0; 64 * 1024],
    ];

    let mut ids = Vec::new();
    for data in &payloads {
        ids.push(session.create_blob(data.clone(), None).await.unwrap());
    }
    for (id, data) in ids.iter().zip(&payloads) {
        assert_eq!(&session.get_blob(*id, None).await.unwrap(), data);
    }

    session.destroy_blobs(ids.clone(), None).await.unwrap();
    for id in ids {
        let err = session.get_blob(id, None).await.unwrap_err();
        assert!(matches!(err, SessionError::Evaluation(_)), "{err:?}");
    }
}

#[tokio::test]
async fn plots_arrive_as_blobs() {
    let (_provider, session) = {
        let provider = provider(FakeConnector::with_program(FakeProgram::new())).await;
        let session = provider.get_or_create(SessionId::new_v4()).unwrap();
        (provider, session)
    };
    let callbacks = std::sync::Arc::new(rh_engine::RecordingCallbacks::default());
    session
        .start_host(startup(), callbacks.clone(), SPEC_WAIT_MAX, None)
        .await
        .unwrap();

    within(session.evaluate("plot(1, 2)", Nesting::TopLevel, None))
        .await
        .unwrap();

    let blob = callbacks
        .calls()
        .into_iter()
        .find_map(|call| match call {
            rh_core::HostCallback::Plot { blob_id } => Some(blob_id),
            _ => None,
        })
        .expect("plot callback");
    let data = session.get_blob(blob, None).await.unwrap();
    assert!(data.starts_with(rh_adapters::fake::PLOT_MAGIC));
}
