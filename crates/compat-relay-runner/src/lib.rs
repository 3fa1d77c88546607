//! compat-relay runtime library.
//!
//! Wires the frame transport, the dispatch loop, the invoker registry, and
//! the browser bridge into the relay binary. It is consumed by `main.rs` and
//! by integration tests.

pub mod app_state;
pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod invokers;
pub mod obs;
pub mod ops;
pub mod relay;
pub mod router;
pub mod transport;
