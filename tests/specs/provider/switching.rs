//! Broker switching specs

use crate::prelude::*;

#[tokio::test]
async fn switching_to_the_current_broker_is_a_no_op() {
    let connector = FakeConnector::with_program(FakeProgram::new());
    let provider = provider(connector.clone()).await;

    for _ in 0..3 {
        assert!(
            provider
                .try_switch_broker(BrokerTarget::local(), None)
                .await
        );
    }

    assert_eq!(connector.connect_count("local"), 1);
    assert_eq!(provider.current_broker(), Some(BrokerTarget::local()));
}

#[tokio::test]
async fn a_failed_switch_keeps_sessions_on_the_old_broker() {
    let connector = FakeConnector::with_program(FakeProgram::new());
    connector.fail_target("remote");
    let provider = provider(connector.clone()).await;

    assert!(
        !provider
            .try_switch_broker(BrokerTarget::new("remote"), None)
            .await
    );
    assert_eq!(provider.current_broker(), Some(BrokerTarget::local()));

    let session = provider.get_or_create(SessionId::new_v4()).unwrap();
    start(&session).await;
    assert_eq!(connector.started_on(), vec!["local".to_string()]);
}

#[tokio::test]
async fn sessions_started_after_a_switch_use_the_new_broker() {
    let connector = FakeConnector::with_program(FakeProgram::new());
    let provider = provider(connector.clone()).await;
    let before = provider.get_or_create(SessionId::new_v4()).unwrap();
    start(&before).await;

    assert!(
        provider
            .try_switch_broker(BrokerTarget::new("remote"), None)
            .await
    );
    let after = provider.get_or_create(SessionId::new_v4()).unwrap();
    start(&after).await;

    assert!(before.is_host_running());
    assert_eq!(
        connector.started_on(),
        vec!["local".to_string(), "remote".to_string()]
    );
}
