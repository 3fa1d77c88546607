#![cfg(unix)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use bytes::Bytes;
use prost::Message;

use compat_relay_core::error::ErrorClass;
use compat_relay_core::protocol::envelope::{
    ClientCompatRequest, ClientCompatResponse, ClientResponseResult, Header,
};
use compat_relay_runner::dispatch::{Invocation, Invoker};
use compat_relay_runner::invokers::ProcessInvoker;

/// `cat` echoes the frame back, so the "request" we send is already the
/// response envelope we expect to read.
fn canned(test_name: &str) -> Invocation {
    let result = ClientResponseResult {
        response_trailers: vec![Header::new("x-from", [test_name])],
        ..Default::default()
    };
    let raw = ClientCompatResponse::success(test_name, result).encode_to_vec();
    Invocation {
        request: ClientCompatRequest {
            test_name: test_name.into(),
            ..Default::default()
        },
        raw: Bytes::from(raw),
    }
}

fn trailer(result: &ClientResponseResult) -> &str {
    &result.response_trailers[0].value[0]
}

#[tokio::test]
async fn round_trips_through_a_long_lived_child() {
    let invoker = ProcessInvoker::new("cat", Vec::new());
    assert_eq!(invoker.name(), "process");

    let first = invoker.invoke(canned("first")).await.unwrap();
    let second = invoker.invoke(canned("second")).await.unwrap();

    assert_eq!(trailer(&first), "first");
    assert_eq!(trailer(&second), "second");
}

#[tokio::test]
async fn abandoned_call_forces_a_fresh_child() {
    let invoker = ProcessInvoker::new("sh", vec!["-c".into(), "sleep 1; exec cat".into()]);

    let abandoned = tokio::time::timeout(Duration::from_millis(50), invoker.invoke(canned("stale"))).await;
    assert!(abandoned.is_err());

    // A reused child would answer with the stale frame first.
    let fresh = invoker.invoke(canned("fresh")).await.unwrap();
    assert_eq!(trailer(&fresh), "fresh");
}

#[tokio::test]
async fn child_that_exits_is_an_invocation_error() {
    let invoker = ProcessInvoker::new("true", Vec::new());
    let err = invoker.invoke(canned("gone")).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Invocation);
}

#[tokio::test]
async fn missing_program_is_an_invocation_error() {
    let invoker = ProcessInvoker::new("/nonexistent/compat-relay-helper", Vec::new());
    let err = invoker.invoke(canned("nope")).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Invocation);
    assert!(err.to_string().starts_with("failed to start /nonexistent/compat-relay-helper"));
}
