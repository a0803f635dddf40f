// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn noop_callbacks_answer_with_defaults() {
    let cb = NoOpCallbacks;
    assert_eq!(
        answer(&cb, HostCallback::ShowMessage { message: "hi".to_string() }).await,
        CallbackReply::Ack
    );
    assert_eq!(
        answer(
            &cb,
            HostCallback::ReadUserInput {
                prompt: "name? ".to_string(),
                max_length: 0
            }
        )
        .await,
        CallbackReply::Input {
            text: String::new()
        }
    );
    assert_eq!(
        answer(&cb, HostCallback::Locator).await,
        CallbackReply::Locator { point: None }
    );
}

#[tokio::test]
async fn recorded_input_is_truncated_to_max_length() {
    let cb = RecordingCallbacks::new();
    cb.push_input("héllo world");
    let reply = answer(
        &cb,
        HostCallback::ReadUserInput {
            prompt: "? ".to_string(),
            max_length: 2,
        },
    )
    .await;
    // 'é' is two bytes and would be split at 2
    assert_eq!(
        reply,
        CallbackReply::Input {
            text: "h".to_string()
        }
    );
    assert_eq!(cb.calls().len(), 1);
}

#[tokio::test]
async fn plot_and_locator_are_recorded() {
    let cb = RecordingCallbacks::new();
    cb.set_locator(Some(LocatorPoint { x: 1.0, y: 2.5 }));
    answer(
        &cb,
        HostCallback::Plot {
            blob_id: BlobId::new(3),
        },
    )
    .await;
    let reply = answer(&cb, HostCallback::Locator).await;
    assert_eq!(
        reply,
        CallbackReply::Locator {
            point: Some(LocatorPoint { x: 1.0, y: 2.5 })
        }
    );
    assert_eq!(
        cb.calls(),
        vec![
            HostCallback::Plot {
                blob_id: BlobId::new(3)
            },
            HostCallback::Locator
        ]
    );
}
