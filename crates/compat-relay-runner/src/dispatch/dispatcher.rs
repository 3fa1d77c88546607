use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use compat_relay_core::error::{RelayError, Result};
use compat_relay_core::protocol::envelope::{ClientCompatRequest, ClientResponseResult};

/// One decoded request plus the frame payload it came from.
///
/// Forwarding invokers send `raw` on unchanged instead of re-encoding.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request: ClientCompatRequest,
    pub raw: Bytes,
}

/// The collaborator that actually runs a test case against the system under test.
#[async_trait]
pub trait Invoker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this invoker can run `method` at all.
    fn supports(&self, _method: &str) -> bool {
        true
    }

    async fn invoke(&self, call: Invocation) -> Result<ClientResponseResult>;
}

/// Registry of invokers by name. The relay selects one at startup.
#[derive(Default)]
pub struct Dispatcher {
    invokers: DashMap<&'static str, Arc<dyn Invoker>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            invokers: DashMap::new(),
        }
    }

    pub fn register(&self, invoker: Arc<dyn Invoker>) {
        self.invokers.insert(invoker.name(), invoker);
    }

    pub fn registered(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.invokers.iter().map(|e| *e.key()).collect();
        names.sort_unstable();
        names
    }

    pub fn select(&self, name: &str) -> Result<Arc<dyn Invoker>> {
        self.invokers
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| {
                RelayError::BadConfig(format!(
                    "unknown invoker: {name} (registered: {})",
                    self.registered().join(", ")
                ))
            })
    }
}
