use std::time::Duration;

use async_trait::async_trait;

use compat_relay_core::error::Result;
use compat_relay_core::protocol::envelope::{
    CancelTiming, ClientCompatRequest, ClientResponseResult, Code, ConformancePayload, Header,
    RequestInfo, RpcError,
};

use crate::dispatch::{Invocation, Invoker};

const SUPPORTED_METHODS: [&str; 6] = [
    "Unary",
    "IdempotentUnary",
    "ServerStream",
    "ClientStream",
    "BidiStream",
    "Unimplemented",
];

/// In-process collaborator that echoes what it was sent. Useful to prove the
/// relay end to end without a browser.
#[derive(Debug, Default)]
pub struct LoopbackInvoker;

impl LoopbackInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Invoker for LoopbackInvoker {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn supports(&self, method: &str) -> bool {
        SUPPORTED_METHODS.contains(&method)
    }

    async fn invoke(&self, call: Invocation) -> Result<ClientResponseResult> {
        let req = call.request;
        if req.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(u64::from(req.request_delay_ms))).await;
        }
        Ok(echo(&req))
    }
}

/// Build the response the loopback collaborator gives for `req`.
pub fn echo(req: &ClientCompatRequest) -> ClientResponseResult {
    let mut result = ClientResponseResult {
        response_headers: req.request_headers.clone(),
        response_trailers: vec![Header::new("x-relay-invoker", ["loopback"])],
        ..Default::default()
    };

    if req.method == "Unimplemented" {
        result.error = Some(RpcError::new(
            Code::Unimplemented,
            format!("{}.{} is not implemented", req.service, req.method),
        ));
        return result;
    }

    let info = RequestInfo {
        request_headers: req.request_headers.clone(),
        timeout_ms: req.timeout_ms.map(i64::from),
        requests: req.request_messages.clone(),
    };

    result.payloads = req
        .request_messages
        .iter()
        .enumerate()
        .map(|(i, msg)| ConformancePayload {
            data: msg.value.clone(),
            request_info: (i == 0).then(|| info.clone()),
        })
        .collect();

    match req.cancel_timing() {
        Some(CancelTiming::BeforeCloseSend(())) => {
            result.payloads.clear();
            result.num_unsent_requests = i32::try_from(req.request_messages.len()).unwrap_or(i32::MAX);
            result.error = Some(RpcError::new(Code::Canceled, "canceled before close send"));
        }
        Some(CancelTiming::AfterNumResponses(n)) => {
            result.payloads.truncate(usize::try_from(*n).unwrap_or(usize::MAX));
            result.error = Some(RpcError::new(
                Code::Canceled,
                format!("canceled after {n} responses"),
            ));
        }
        // Responses are produced immediately, so a timed cancel never wins.
        Some(CancelTiming::AfterCloseSendMs(_)) | None => {}
    }

    result
}
