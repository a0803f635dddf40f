//! Browser stepping specs

use crate::prelude::*;

/// `main.R` calls `greet()` from `lib.R` on line 2.
fn program() -> FakeProgram {
    FakeProgram::new()
        .with_file("main.R", "a <- 1\ngreet()\nb <- 2\nc <- 3")
        .with_file("lib.R", "msg <- 'hi'\ncat(msg)")
        .with_function("greet", "lib.R", 1, 2)
}

async fn top(debug: &DebugSession) -> Option<SourceLocation> {
    let frames = debug.stack_frames(None).await.unwrap();
    frames.first().and_then(|frame| frame.location())
}

#[tokio::test]
async fn stepping_reports_whether_it_landed_where_intended() {
    let (_provider, session) = running(program()).await;
    let debug = DebugSession::attach(&session, DebugOptions::default());
    let mut hits = debug.breakpoint_hits();
    debug
        .create_breakpoint(SourceLocation::new("main.R", 2), None)
        .await
        .unwrap();
    debug
        .create_breakpoint(SourceLocation::new("main.R", 4), None)
        .await
        .unwrap();
    debug.enable_breakpoints(true, None).await.unwrap();
    let run = source(&session, "main.R");
    within(hits.recv()).await.unwrap();

    // into greet(), then back out to main.R
    assert!(within(debug.step_into(None)).await.unwrap());
    assert_eq!(top(&debug).await, Some(SourceLocation::new("lib.R", 1)));
    assert!(within(debug.step_out(None)).await.unwrap());
    assert_eq!(top(&debug).await, Some(SourceLocation::new("main.R", 3)));

    // the next statement carries a breakpoint
    let landed = within(debug.step_over(None)).await.unwrap();
    assert!(!landed);
    assert_eq!(top(&debug).await, Some(SourceLocation::new("main.R", 4)));

    debug.continue_execution(None).await.unwrap();
    within(run).await.unwrap().unwrap();
}

#[tokio::test]
async fn stepping_requires_a_pause() {
    let (_provider, session) = running(program()).await;
    let debug = DebugSession::attach(&session, DebugOptions::default());

    let err = debug.step_over(None).await.unwrap_err();
    assert_eq!(err, rh_engine::DebugError::NotPaused);
}
