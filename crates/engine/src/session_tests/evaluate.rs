// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactions and evaluations through a session

use super::*;

#[tokio::test]
async fn evaluate_runs_at_the_open_prompt() {
    let ManualSession {
        provider: _provider,
        session,
        mut host,
    } = manual_session().await;
    let eval = {
        let session = session.clone();
        tokio::spawn(async move { session.evaluate("1 + 1", Nesting::TopLevel, None).await })
    };

    let prompt = host.prompt(PromptContext::Normal);
    let (request_id, at, code) = host.recv_evaluate().await.unwrap();
    assert_eq!(at, prompt);
    assert_eq!(code, "1 + 1");
    host.eval_result(request_id, EvalOutcome::Ok { value: json!(2) });

    assert_eq!(within(eval).await.unwrap(), Ok(json!(2)));
}

#[tokio::test]
async fn evaluation_errors_stay_local() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;

    let err = session
        .evaluate("stop('boom')", Nesting::TopLevel, None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Evaluation("boom".to_string()));

    let value = session.evaluate("41", Nesting::TopLevel, None).await.unwrap();
    assert_eq!(value, json!(41));
    assert!(session.is_host_running());
}

#[tokio::test]
async fn requests_before_start_are_disconnected() {
    let provider = provider(FakeConnector::new()).await;
    let session = provider.get_or_create(SessionId::new_v4()).unwrap();

    let err = session
        .begin_interaction(Nesting::TopLevel, None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Disconnected);
    let err = session
        .evaluate("1", Nesting::Reentrant, None)
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::Disconnected);
}

#[tokio::test]
async fn interactions_are_granted_in_arrival_order() {
    let mut ms = manual_session().await;
    let turns: Vec<_> = (0..3)
        .map(|_| ms.session.queue_interaction(Nesting::TopLevel).unwrap())
        .collect();

    for (i, turn) in turns.into_iter().enumerate() {
        let prompt = ms.host.prompt(PromptContext::Normal);
        let interaction = within(turn.wait(None)).await.unwrap();
        assert_eq!(interaction.prompt().id, prompt);
        interaction.respond(&format!("answer {i}")).unwrap();
        assert_eq!(
            ms.host.recv_respond().await,
            Some((prompt, format!("answer {i}")))
        );
    }
}

#[tokio::test]
async fn dropped_interaction_releases_its_prompt() {
    let mut ms = manual_session().await;
    let prompt = ms.host.prompt(PromptContext::Normal);

    let first = within(ms.session.begin_interaction(Nesting::TopLevel, None))
        .await
        .unwrap();
    assert_eq!(first.prompt().id, prompt);
    drop(first);

    let second = within(ms.session.begin_interaction(Nesting::TopLevel, None))
        .await
        .unwrap();
    assert_eq!(second.prompt().id, prompt);
    assert_eq!(second.depth(), 0);
    assert!(ms.host.try_recv().is_none());
}

#[tokio::test]
async fn token_cancels_only_its_own_request() {
    let mut ms = manual_session().await;
    let token = CancellationToken::new();
    let first = ms.session.queue_interaction(Nesting::TopLevel).unwrap();
    let second = ms.session.queue_interaction(Nesting::TopLevel).unwrap();

    let canceled = {
        let token = token.clone();
        tokio::spawn(async move { first.wait(Some(&token)).await.map(|_| ()) })
    };
    token.cancel();
    assert_eq!(within(canceled).await.unwrap(), Err(SessionError::Canceled));

    let prompt = ms.host.prompt(PromptContext::Normal);
    let interaction = within(second.wait(None)).await.unwrap();
    assert_eq!(interaction.prompt().id, prompt);
    assert!(ms.session.is_host_running());
}

#[tokio::test]
async fn evaluation_scope_keeps_its_prompt_between_evaluations() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let scope = session
        .begin_evaluation(Nesting::TopLevel, None)
        .await
        .unwrap();
    let prompt = scope.prompt().id;

    scope.evaluate("x <- 5", None).await.unwrap();
    assert_eq!(scope.evaluate("x", None).await.unwrap(), json!(5));
    assert_eq!(scope.prompt().id, prompt);
    assert!(!scope.is_browser());
}

#[tokio::test]
async fn reentrant_evaluation_borrows_a_held_prompt() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let held = session
        .begin_interaction(Nesting::TopLevel, None)
        .await
        .unwrap();

    let value = within(session.evaluate("7", Nesting::Reentrant, None))
        .await
        .unwrap();
    assert_eq!(value, json!(7));

    held.respond("cat('done')").unwrap();
}

#[tokio::test]
async fn nested_prompts_complete_in_program_order() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let scope = session
        .begin_evaluation(Nesting::TopLevel, None)
        .await
        .unwrap();
    let outer = tokio::spawn(async move {
        let value = scope.evaluate("readline('first? ')", None).await;
        (scope, value)
    });

    // each level evaluates code that asks for input one level deeper
    let level1 = within(session.begin_interaction(Nesting::Reentrant, None))
        .await
        .unwrap();
    assert_eq!(level1.depth(), 1);
    assert_eq!(level1.context(), PromptContext::Input);
    let middle = tokio::spawn(async move {
        let value = level1.evaluate("readline('second? ')", None).await;
        (level1, value)
    });

    let level2 = within(session.begin_interaction(Nesting::Reentrant, None))
        .await
        .unwrap();
    assert_eq!(level2.depth(), 2);
    let inner = tokio::spawn(async move {
        let value = level2.evaluate("readline('third? ')", None).await;
        (level2, value)
    });

    let level3 = within(session.begin_interaction(Nesting::Reentrant, None))
        .await
        .unwrap();
    assert_eq!(level3.depth(), 3);
    assert_eq!(level3.prompt_text(), "third? ");
    level3.respond("c").unwrap();

    let (level2, value) = within(inner).await.unwrap();
    assert_eq!(value, Ok(json!("c")));
    level2.respond("b").unwrap();

    let (level1, value) = within(middle).await.unwrap();
    assert_eq!(value, Ok(json!("b")));
    level1.respond("a").unwrap();

    let (_scope, value) = within(outer).await.unwrap();
    assert_eq!(value, Ok(json!("a")));
}

#[tokio::test]
async fn cancel_all_keeps_the_host_running() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
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
    let value = within(session.evaluate("3", Nesting::TopLevel, None))
        .await
        .unwrap();
    assert_eq!(value, json!(3));
}

#[tokio::test]
async fn cancel_all_revokes_a_granted_interaction() {
    let mut ms = manual_session().await;
    ms.host.prompt(PromptContext::Normal);
    let interaction = within(ms.session.begin_interaction(Nesting::TopLevel, None))
        .await
        .unwrap();

    ms.session.cancel_all().await;

    assert_eq!(ms.host.recv().await, Some(ClientMessage::Interrupt));
    assert_eq!(interaction.respond("1"), Err(SessionError::Canceled));
    assert!(ms.session.is_host_running());
}

#[tokio::test]
async fn output_is_broadcast_in_host_order() {
    let (_provider, session) = interpreter_session(FakeProgram::new()).await;
    let mut events = session.subscribe();

    session
        .evaluate("print('one')\nprint('two')", Nesting::TopLevel, None)
        .await
        .unwrap();

    let mut texts = Vec::new();
    while texts.len() < 2 {
        if let SessionEvent::Output { text, .. } =
            next_event(&mut events, |e| matches!(e, SessionEvent::Output { .. })).await
        {
            texts.push(text);
        }
    }
    assert_eq!(texts, ["[1] one\n", "[1] two\n"]);
}
