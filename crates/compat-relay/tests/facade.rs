#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use prost::Message;

use compat_relay::core::protocol::frame;
use compat_relay::prelude::*;

/// Refuses every call; proves a downstream invoker plugs into the loop.
struct Refuser;

#[async_trait]
impl Invoker for Refuser {
    fn name(&self) -> &'static str {
        "refuser"
    }

    async fn invoke(&self, call: Invocation) -> Result<ClientResponseResult> {
        Err(RelayError::Invocation(format!("refused {}", call.request.test_name)))
    }
}

#[tokio::test]
async fn custom_invoker_runs_through_the_facade() {
    let mut input = BytesMut::new();
    let req = ClientCompatRequest {
        test_name: "facade".into(),
        ..Default::default()
    };
    frame::encode_frame(&req.encode_to_vec(), &mut input).unwrap();

    let mut relay = Relay::new(
        Cursor::new(input.to_vec()),
        Vec::new(),
        Arc::new(Refuser),
        Duration::from_secs(1),
        Arc::new(RelayMetrics::default()),
    );
    relay.run().await.unwrap();
    assert_eq!(relay.state(), RelayState::Terminated);

    let mut out = BytesMut::from(&relay.into_writer()[..]);
    let resp = ClientCompatResponse::decode(frame::decode_frame(&mut out).unwrap()).unwrap();
    assert!(resp.is_error());
    assert_eq!(RelayError::Invocation(String::new()).class(), ErrorClass::Invocation);
}
