#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use prost::Message;

use compat_relay_core::error::{ErrorClass, RelayError};
use compat_relay_core::protocol::envelope::{
    ClientCompatRequest, ClientCompatResponse, ClientResponseResult, Header,
};
use compat_relay_runner::bridge::BridgeHub;
use compat_relay_runner::dispatch::{Invocation, Invoker};
use compat_relay_runner::invokers::BridgeInvoker;
use compat_relay_runner::obs::RelayMetrics;

fn hub(attach_timeout_ms: u64) -> Arc<BridgeHub> {
    Arc::new(BridgeHub::new(
        Duration::from_millis(attach_timeout_ms),
        Arc::new(RelayMetrics::default()),
    ))
}

fn invocation(test_name: &str) -> Invocation {
    let request = ClientCompatRequest {
        test_name: test_name.into(),
        method: "Unary".into(),
        ..Default::default()
    };
    let raw = Bytes::from(request.encode_to_vec());
    Invocation { request, raw }
}

#[tokio::test]
async fn call_is_answered_by_attached_page() {
    let hub = hub(1_000);
    let (_, mut calls) = hub.attach();
    assert!(hub.is_attached());

    let page = tokio::spawn(async move {
        let call = calls.recv().await.unwrap();
        let mut reply = call.payload.to_vec();
        reply.reverse();
        call.reply.send(Ok(Bytes::from(reply))).unwrap();
    });

    let reply = hub.call(Bytes::from_static(b"abc")).await.unwrap();
    assert_eq!(&reply[..], b"cba");
    page.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn call_fails_when_no_page_attaches_in_time() {
    let hub = hub(500);
    let err = hub.call(Bytes::from_static(b"x")).await.unwrap_err();

    assert_eq!(err.class(), ErrorClass::Invocation);
    assert_eq!(err.to_string(), "no browser session attached within 500 ms");
}

#[tokio::test(start_paused = true)]
async fn call_waits_for_a_late_page() {
    let hub = hub(5_000);
    let page_hub = Arc::clone(&hub);

    let page = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let (_, mut calls) = page_hub.attach();
        let call = calls.recv().await.unwrap();
        call.reply.send(Ok(call.payload)).unwrap();
    });

    let reply = hub.call(Bytes::from_static(b"late")).await.unwrap();
    assert_eq!(&reply[..], b"late");
    page.await.unwrap();
}

#[tokio::test]
async fn page_dropping_the_call_is_an_invocation_error() {
    let hub = hub(1_000);
    let (_, mut calls) = hub.attach();

    tokio::spawn(async move {
        let call = calls.recv().await.unwrap();
        drop(call);
        // keep the session open so the failure comes from the dropped reply
        calls.recv().await;
    });

    let err = hub.call(Bytes::from_static(b"x")).await.unwrap_err();
    assert!(matches!(err, RelayError::Invocation(_)));
}

#[tokio::test]
async fn page_error_text_reaches_the_caller() {
    let hub = hub(1_000);
    let (_, mut calls) = hub.attach();

    tokio::spawn(async move {
        let call = calls.recv().await.unwrap();
        call.reply
            .send(Err(RelayError::Invocation("TypeError: fetch failed".into())))
            .unwrap();
    });

    let err = hub.call(Bytes::from_static(b"x")).await.unwrap_err();
    assert_eq!(err.to_string(), "TypeError: fetch failed");
}

#[tokio::test(start_paused = true)]
async fn abandoned_call_retires_the_session() {
    let hub = hub(1_000);
    let (session, mut calls) = hub.attach();

    let held = tokio::spawn(async move {
        // the page sits on the call and never answers
        let call = calls.recv().await.unwrap();
        calls.recv().await;
        call
    });

    let gave_up = tokio::time::timeout(Duration::from_millis(200), hub.call(Bytes::from_static(b"x"))).await;
    assert!(gave_up.is_err());
    assert!(!hub.is_attached());

    // the retired session's queue is closed, and its reply goes nowhere
    let call = held.await.unwrap();
    assert!(call.reply.is_closed());

    // a stale detach from that session is harmless
    hub.detach(session);
    let (fresh, _calls) = hub.attach();
    assert_ne!(fresh, session);
    assert!(hub.is_attached());
}

#[test]
fn stale_detach_does_not_clear_newer_session() {
    let metrics = Arc::new(RelayMetrics::default());
    let hub = BridgeHub::new(Duration::from_millis(100), Arc::clone(&metrics));

    let (first, _first_rx) = hub.attach();
    let (second, _second_rx) = hub.attach();
    assert_ne!(first, second);

    hub.detach(first);
    assert!(hub.is_attached());
    assert_eq!(metrics.bridge_attached.get(), 1);

    hub.detach(second);
    assert!(!hub.is_attached());
    assert_eq!(metrics.bridge_attached.get(), 0);
}

#[test]
fn dropped_session_receiver_counts_as_detached() {
    let hub = hub(100);
    let (_, rx) = hub.attach();
    drop(rx);
    assert!(!hub.is_attached());
}

#[tokio::test]
async fn bridge_invoker_forwards_raw_request_and_decodes_reply() {
    let hub = hub(1_000);
    let (_, mut calls) = hub.attach();
    let invoker = BridgeInvoker::new(Arc::clone(&hub));
    let call = invocation("bridged");
    let sent = call.raw.clone();

    let page = tokio::spawn(async move {
        let call = calls.recv().await.unwrap();
        assert_eq!(call.payload, sent);

        let request = ClientCompatRequest::decode(call.payload).unwrap();
        let result = ClientResponseResult {
            response_headers: vec![Header::new("content-type", ["application/proto"])],
            ..Default::default()
        };
        let reply = ClientCompatResponse::success(request.test_name, result).encode_to_vec();
        call.reply.send(Ok(Bytes::from(reply))).unwrap();
    });

    let result = invoker.invoke(call).await.unwrap();
    assert_eq!(result.response_headers[0].name, "content-type");
    page.await.unwrap();
}

#[tokio::test]
async fn bridge_invoker_surfaces_page_failure_envelope() {
    let hub = hub(1_000);
    let (_, mut calls) = hub.attach();
    let invoker = BridgeInvoker::new(Arc::clone(&hub));

    tokio::spawn(async move {
        let call = calls.recv().await.unwrap();
        let reply = ClientCompatResponse::failure("bridged", "client exploded").encode_to_vec();
        call.reply.send(Ok(Bytes::from(reply))).unwrap();
    });

    let err = invoker.invoke(invocation("bridged")).await.unwrap_err();
    assert_eq!(err.to_string(), "client exploded");
}
