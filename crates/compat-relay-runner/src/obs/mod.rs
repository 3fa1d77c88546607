//! Lightweight in-process metrics.
//!
//! Metrics are stored as atomics and rendered by the `/metrics` handler on
//! the bridge listener.

pub mod metrics;

pub use metrics::RelayMetrics;
