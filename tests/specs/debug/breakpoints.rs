//! Breakpoint specs

use crate::prelude::*;

fn script() -> FakeProgram {
    FakeProgram::new().with_file("script.R", "x <- 1\ny <- 2\ncat('done')")
}

#[tokio::test]
async fn breakpoint_pauses_once_at_its_line() {
    let (_provider, session) = running(script()).await;
    let debug = DebugSession::attach(&session, DebugOptions::default());
    let mut hits = debug.breakpoint_hits();

    let location = SourceLocation::new("script.R", 2);
    let breakpoint = debug
        .create_breakpoint(location.clone(), None)
        .await
        .unwrap();
    debug.enable_breakpoints(true, None).await.unwrap();
    let run = source(&session, "script.R");

    let hit = within(hits.recv()).await.unwrap();
    assert_eq!(hit.location, location);
    let frames = debug.stack_frames(None).await.unwrap();
    assert_eq!(frames[0].location(), Some(location));

    debug.continue_execution(None).await.unwrap();
    assert_eq!(within(run).await.unwrap(), Ok(Value::Null));
    assert_eq!(breakpoint.hit_count(), 1);
    assert!(hits.try_recv().is_err());
}

#[tokio::test]
async fn deleted_breakpoint_no_longer_pauses() {
    let (_provider, session) = running(script()).await;
    let debug = DebugSession::attach(&session, DebugOptions::default());
    let breakpoint = debug
        .create_breakpoint(SourceLocation::new("script.R", 2), None)
        .await
        .unwrap();
    debug.enable_breakpoints(true, None).await.unwrap();

    breakpoint.clone().delete(None).await.unwrap();
    within(source(&session, "script.R"))
        .await
        .unwrap()
        .unwrap();

    assert!(debug.breakpoints().is_empty());
    assert_eq!(breakpoint.hit_count(), 0);
}

#[tokio::test]
async fn creating_a_breakpoint_twice_shares_it() {
    let (_provider, session) = running(script()).await;
    let debug = DebugSession::attach(&session, DebugOptions::default());
    let location = SourceLocation::new("script.R", 3);

    let first = debug
        .create_breakpoint(location.clone(), None)
        .await
        .unwrap();
    let second = debug
        .create_breakpoint(location.clone(), None)
        .await
        .unwrap();
    debug.enable_breakpoints(true, None).await.unwrap();
    let mut hits = debug.breakpoint_hits();
    let run = source(&session, "script.R");
    within(hits.recv()).await.unwrap();
    debug.continue_execution(None).await.unwrap();
    within(run).await.unwrap().unwrap();

    assert_eq!(first.hit_count(), 1);
    assert_eq!(second.hit_count(), 1);
    assert_eq!(debug.breakpoints(), vec![location]);
}
