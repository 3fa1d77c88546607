use std::sync::Arc;

use async_trait::async_trait;

use compat_relay_core::error::Result;
use compat_relay_core::protocol::envelope::{decode_response, ClientResponseResult};

use crate::bridge::BridgeHub;
use crate::dispatch::{Invocation, Invoker};

/// Forwards each request to the browser page attached to the hub.
pub struct BridgeInvoker {
    hub: Arc<BridgeHub>,
}

impl BridgeInvoker {
    pub fn new(hub: Arc<BridgeHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Invoker for BridgeInvoker {
    fn name(&self) -> &'static str {
        "bridge"
    }

    async fn invoke(&self, call: Invocation) -> Result<ClientResponseResult> {
        let reply = self.hub.call(call.raw).await?;
        let response = decode_response(reply)?;
        if response.test_name != call.request.test_name {
            tracing::warn!(
                sent = %call.request.test_name,
                got = %response.test_name,
                "page answered under a different test name"
            );
        }
        response.into_outcome()
    }
}
