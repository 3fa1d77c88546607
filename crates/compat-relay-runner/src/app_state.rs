//! Shared application state for the relay.
//!
//! Builds the invoker registry, selects the configured invoker, and holds the
//! bridge hub and metrics shared between the relay loop and the bridge
//! listener. Startup errors are returned, never panicked.

use std::sync::Arc;
use std::time::Duration;

use compat_relay_core::error::Result;

use crate::bridge::BridgeHub;
use crate::config::RelayConfig;
use crate::dispatch::{Dispatcher, Invoker};
use crate::invokers::{BridgeInvoker, LoopbackInvoker, ProcessInvoker};
use crate::obs::RelayMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: RelayConfig,
    invoker: Arc<dyn Invoker>,
    bridge: Arc<BridgeHub>,
    metrics: Arc<RelayMetrics>,
}

impl AppState {
    pub fn new(cfg: RelayConfig) -> Result<Self> {
        let metrics = Arc::new(RelayMetrics::default());
        let bridge = Arc::new(BridgeHub::new(
            Duration::from_millis(cfg.bridge.attach_timeout_ms),
            Arc::clone(&metrics),
        ));

        let dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(LoopbackInvoker::new()));
        dispatcher.register(Arc::new(BridgeInvoker::new(Arc::clone(&bridge))));
        if let Some(process) = &cfg.process {
            dispatcher.register(Arc::new(ProcessInvoker::new(
                process.program.clone(),
                process.args.clone(),
            )));
        }

        let invoker = dispatcher.select(&cfg.relay.invoker)?;
        tracing::info!(
            invoker = invoker.name(),
            registered = ?dispatcher.registered(),
            "invoker selected"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                invoker,
                bridge,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn invoker(&self) -> Arc<dyn Invoker> {
        Arc::clone(&self.inner.invoker)
    }

    pub fn bridge(&self) -> Arc<BridgeHub> {
        Arc::clone(&self.inner.bridge)
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_millis(self.inner.cfg.relay.watchdog_ms)
    }

    /// Whether the bridge listener should be served at all.
    pub fn uses_bridge(&self) -> bool {
        self.inner.invoker.name() == "bridge"
    }
}
