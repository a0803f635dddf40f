// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn reply(rx: &mut BlobReply) -> Result<ReplyBody, SessionError> {
    match rx.try_recv() {
        Ok(result) => result,
        Err(e) => panic!("no reply delivered: {e:?}"),
    }
}

#[test]
fn create_reply_records_a_live_blob() {
    let mut table = BlobTable::new();
    let mut rx = table.register(RequestId::new(1), BlobRequest::Create);
    assert!(table.is_pending(RequestId::new(1)));

    table.on_reply(
        RequestId::new(1),
        ReplyBody::BlobCreated {
            blob_id: BlobId::new(7),
        },
    );
    assert_eq!(
        reply(&mut rx),
        Ok(ReplyBody::BlobCreated {
            blob_id: BlobId::new(7)
        })
    );
    assert_eq!(table.live(), 1);
    assert!(!table.is_pending(RequestId::new(1)));
}

#[test]
fn reused_blob_id_is_a_protocol_error() {
    let mut table = BlobTable::new();
    let created = ReplyBody::BlobCreated {
        blob_id: BlobId::new(1),
    };
    let _first = table.register(RequestId::new(1), BlobRequest::Create);
    table.on_reply(RequestId::new(1), created.clone());

    let mut destroy = table.register(
        RequestId::new(2),
        BlobRequest::Destroy(vec![BlobId::new(1)]),
    );
    table.on_reply(RequestId::new(2), ReplyBody::BlobsDestroyed);
    assert_eq!(reply(&mut destroy), Ok(ReplyBody::BlobsDestroyed));
    assert_eq!(table.live(), 0);

    let mut again = table.register(RequestId::new(3), BlobRequest::Create);
    table.on_reply(RequestId::new(3), created);
    assert!(matches!(reply(&mut again), Err(SessionError::Protocol(_))));
}

#[test]
fn ids_below_the_newest_are_rejected() {
    let mut table = BlobTable::new();
    let _first = table.register(RequestId::new(1), BlobRequest::Create);
    table.on_reply(
        RequestId::new(1),
        ReplyBody::BlobCreated {
            blob_id: BlobId::new(5),
        },
    );

    let mut older = table.register(RequestId::new(2), BlobRequest::Create);
    table.on_reply(
        RequestId::new(2),
        ReplyBody::BlobCreated {
            blob_id: BlobId::new(3),
        },
    );
    assert!(matches!(reply(&mut older), Err(SessionError::Protocol(_))));
    assert_eq!(table.live(), 1);

    let mut newer = table.register(RequestId::new(3), BlobRequest::Create);
    table.on_reply(
        RequestId::new(3),
        ReplyBody::BlobCreated {
            blob_id: BlobId::new(6),
        },
    );
    assert!(reply(&mut newer).is_ok());
    assert_eq!(table.live(), 2);
}

#[test]
fn host_error_surfaces_as_evaluation_error() {
    let mut table = BlobTable::new();
    let mut rx = table.register(RequestId::new(1), BlobRequest::Get(BlobId::new(9)));
    table.on_reply(
        RequestId::new(1),
        ReplyBody::Error {
            message: "no blob with id 9".to_string(),
        },
    );
    assert_eq!(
        reply(&mut rx),
        Err(SessionError::Evaluation("no blob with id 9".to_string()))
    );
}

#[test]
fn mismatched_reply_is_a_protocol_error() {
    let mut table = BlobTable::new();
    let mut rx = table.register(RequestId::new(1), BlobRequest::Get(BlobId::new(1)));
    table.on_reply(RequestId::new(1), ReplyBody::BlobsDestroyed);
    assert!(matches!(reply(&mut rx), Err(SessionError::Protocol(_))));
}

#[test]
fn abandoned_request_ignores_late_reply() {
    let mut table = BlobTable::new();
    let rx = table.register(RequestId::new(1), BlobRequest::Create);
    drop(rx);
    table.abandon(RequestId::new(1));
    table.on_reply(
        RequestId::new(1),
        ReplyBody::BlobCreated {
            blob_id: BlobId::new(1),
        },
    );
    assert_eq!(table.live(), 0);
}

#[test]
fn fail_all_fails_pending_and_resets_ids() {
    let mut table = BlobTable::new();
    let _created = table.register(RequestId::new(1), BlobRequest::Create);
    table.on_reply(
        RequestId::new(1),
        ReplyBody::BlobCreated {
            blob_id: BlobId::new(1),
        },
    );
    let mut pending = table.register(RequestId::new(2), BlobRequest::Get(BlobId::new(1)));

    table.fail_all(SessionError::Disconnected);
    assert_eq!(reply(&mut pending), Err(SessionError::Disconnected));
    assert_eq!(table.live(), 0);

    // a new host may hand out the same id again
    let mut rx = table.register(RequestId::new(3), BlobRequest::Create);
    table.on_reply(
        RequestId::new(3),
        ReplyBody::BlobCreated {
            blob_id: BlobId::new(1),
        },
    );
    assert!(reply(&mut rx).is_ok());
}
