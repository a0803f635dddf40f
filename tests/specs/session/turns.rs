//! Turn admission specs: arrival order and nested prompts

use crate::prelude::*;

#[tokio::test]
async fn top_level_evaluations_run_in_arrival_order() {
    let (_provider, session) = running(FakeProgram::new()).await;
    let mut mark = session.subscribe();

    let evaluations: Vec<_> = (0..5)
        .map(|i| {
            let turn = session.queue_interaction(Nesting::TopLevel).unwrap();
            tokio::spawn(async move {
                let interaction = turn.wait(None).await?;
                interaction.evaluate(&format!("cat('{i}')"), None).await?;
                interaction.respond(&format!("n <- {i}"))
            })
        })
        .collect();
    for evaluation in evaluations {
        within(evaluation).await.unwrap().unwrap();
    }

    let mut order = Vec::new();
    while let Ok(event) = mark.try_recv() {
        if let rh_core::SessionEvent::Output { text, .. } = event {
            order.push(text);
        }
    }
    assert_eq!(order, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test]
async fn three_nested_inputs_unwind_innermost_first() {
    let (_provider, session) = running(FakeProgram::new()).await;
    let outer = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .evaluate("readline('one? ')", Nesting::TopLevel, None)
                .await
        })
    };

    let level1 = within(session.begin_interaction(Nesting::Reentrant, None))
        .await
        .unwrap();
    assert_eq!(level1.context(), PromptContext::Input);
    let middle = tokio::spawn(async move {
        let value = level1.evaluate("readline('two? ')", None).await;
        (level1, value)
    });

    let level2 = within(session.begin_interaction(Nesting::Reentrant, None))
        .await
        .unwrap();
    let inner = tokio::spawn(async move {
        let value = level2.evaluate("readline('three? ')", None).await;
        (level2, value)
    });

    let level3 = within(session.begin_interaction(Nesting::Reentrant, None))
        .await
        .unwrap();
    assert_eq!(level3.depth(), 3);
    level3.respond("3").unwrap();

    let (level2, value) = within(inner).await.unwrap();
    assert_eq!(value, Ok(json!("3")));
    level2.respond("2").unwrap();

    let (level1, value) = within(middle).await.unwrap();
    assert_eq!(value, Ok(json!("2")));
    level1.respond("1").unwrap();

    assert_eq!(within(outer).await.unwrap(), Ok(json!("1")));
}
