// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn local_targets_need_no_connection() {
    for target in [
        BrokerTarget::new("local"),
        BrokerTarget::new("desk").with_path("local"),
    ] {
        let broker = StandardConnector::new().connect(&target).await.unwrap();
        assert!(matches!(broker, AnyBroker::Local(_)));
        assert_eq!(broker.name(), target.name);
    }
}

#[tokio::test]
async fn unsupported_paths_are_rejected() {
    for path in ["ssh://box", "tcp://"] {
        let target = BrokerTarget::new("x").with_path(path);
        let err = StandardConnector::new().connect(&target).await.unwrap_err();
        assert!(matches!(err, BrokerError::Unsupported(p) if p == path));
    }
}

#[tokio::test]
async fn tcp_target_probes_the_address() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let target = BrokerTarget::new("lab").with_path(format!("tcp://{addr}"));

    let broker = StandardConnector::new().connect(&target).await.unwrap();
    match broker {
        AnyBroker::Remote(remote) => assert_eq!(remote.addr(), addr.to_string()),
        other => panic!("expected remote broker, got {other:?}"),
    }
}
