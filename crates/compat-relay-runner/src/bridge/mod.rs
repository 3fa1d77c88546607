//! Browser bridge: hub shared by the WebSocket session and the bridge invoker.

pub mod hub;

pub use hub::{BridgeCall, BridgeHub};
