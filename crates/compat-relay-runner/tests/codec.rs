#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::extract::ws::Message;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use compat_relay_core::error::RelayError;
use compat_relay_runner::transport::codec::{decode, FrameReader, FrameWriter, Inbound};

#[tokio::test]
async fn writer_output_reads_back_in_order() {
    let (client, server) = tokio::io::duplex(16);
    let mut writer = FrameWriter::new(client);
    let mut reader = FrameReader::new(server);

    let produce = tokio::spawn(async move {
        for payload in [
            &b"alpha"[..],
            &b""[..],
            &b"a much longer payload than the pipe buffer"[..],
        ] {
            writer.write_frame(payload).await.unwrap();
        }
        writer.shutdown().await.unwrap();
    });

    let frames: Vec<_> = reader.by_ref().map(|f| f.unwrap()).collect().await;
    produce.await.unwrap();

    assert_eq!(frames.len(), 3);
    assert_eq!(&frames[0][..], b"alpha");
    assert!(frames[1].is_empty());
    assert_eq!(&frames[2][..], b"a much longer payload than the pipe buffer");
    assert!(reader.next_frame().await.unwrap().is_none());
}

#[tokio::test]
async fn short_payload_at_end_of_input_is_truncation() {
    let (mut client, server) = tokio::io::duplex(64);
    client.write_all(&[0, 0, 0, 5, b'h', b'e']).await.unwrap();
    drop(client);

    let mut reader = FrameReader::new(server);
    match reader.next_frame().await {
        Err(RelayError::TruncatedFrame { expected, received }) => {
            assert_eq!((expected, received), (5, 2));
        }
        other => panic!("expected truncation, got {other:?}"),
    }
}

#[tokio::test]
async fn writer_emits_prefix_then_payload() {
    let mut writer = FrameWriter::new(Vec::new());
    writer.write_frame(b"ab").await.unwrap();
    assert_eq!(writer.into_inner(), vec![0, 0, 0, 2, b'a', b'b']);
}

#[test]
fn bridge_messages_decode_once() {
    assert!(matches!(decode(Message::Binary(vec![1, 2])), Inbound::Reply(b) if &b[..] == [1, 2]));
    assert!(matches!(decode(Message::Text("oops".into())), Inbound::PageError(s) if s == "oops"));
    assert!(matches!(decode(Message::Ping(vec![9])), Inbound::Ping(p) if p == vec![9]));
    assert!(matches!(decode(Message::Pong(Vec::new())), Inbound::Pong));
    assert!(matches!(decode(Message::Close(None)), Inbound::Close));
}
