// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rh_core::{PromptContext, PromptId, PromptInfo, RequestId};

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original)
        .await
        .expect("write failed");

    // write_message adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());
    assert_eq!(&buffer[..4], &(original.len() as u32).to_be_bytes());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[test]
fn encode_returns_json_without_length_prefix() {
    let encoded = encode(&ClientMessage::Interrupt).expect("encode failed");
    assert_eq!(encoded.first(), Some(&b'{'));
}

#[tokio::test]
async fn read_message_on_empty_stream_is_connection_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, WireError::ConnectionClosed));
}

#[tokio::test]
async fn read_message_rejects_oversized_length() {
    let mut buffer = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();
    buffer.extend_from_slice(b"{}");
    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, WireError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn truncated_payload_is_io_error() {
    let mut buffer = 10u32.to_be_bytes().to_vec();
    buffer.extend_from_slice(b"{\"ty");
    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, WireError::Io(_)));
}

#[tokio::test]
async fn frames_decode_to_typed_messages() {
    let msg = HostMessage::Prompt(PromptInfo {
        id: PromptId::new(3),
        text: "> ".to_string(),
        context: PromptContext::Normal,
        max_length: 0,
    });
    let mut buffer = Vec::new();
    write_frame(&mut buffer, &msg).await.unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let decoded: HostMessage = read_frame(&mut cursor).await.unwrap();
    assert_eq!(decoded, msg);
}

#[tokio::test]
async fn spawn_framed_pumps_both_directions() {
    let (client_io, host_io) = tokio::io::duplex(4096);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (mut host_read, mut host_write) = tokio::io::split(host_io);

    let mut conn = spawn_framed("test", client_read, client_write);

    conn.outbound
        .send(ClientMessage::Evaluate {
            request_id: RequestId::new(1),
            prompt_id: PromptId::new(2),
            code: "1".to_string(),
        })
        .unwrap();
    let received: ClientMessage = read_frame(&mut host_read).await.unwrap();
    assert_eq!(received.name(), "evaluate");

    let reply = HostMessage::Output {
        stream: rh_core::OutputStream::Stdout,
        text: "hi".to_string(),
    };
    write_frame(&mut host_write, &reply).await.unwrap();
    let got = conn.inbound.recv().await.unwrap().unwrap();
    assert_eq!(got, reply);
}

#[tokio::test]
async fn spawn_framed_closes_inbound_on_eof() {
    let (client_io, host_io) = tokio::io::duplex(64);
    let (client_read, client_write) = tokio::io::split(client_io);
    let mut conn = spawn_framed("test", client_read, client_write);

    drop(host_io);
    assert!(conn.inbound.recv().await.is_none());
}

#[tokio::test]
async fn spawn_framed_reports_garbage_then_closes() {
    let (client_io, host_io) = tokio::io::duplex(64);
    let (client_read, client_write) = tokio::io::split(client_io);
    let (_host_read, mut host_write) = tokio::io::split(host_io);
    let mut conn = spawn_framed("test", client_read, client_write);

    write_message(&mut host_write, b"not json").await.unwrap();
    let first = conn.inbound.recv().await.unwrap();
    assert!(matches!(first, Err(WireError::Json(_))));
    assert!(conn.inbound.recv().await.is_none());
}
