//! Built-in collaborators.
//!
//! - `loopback`: echoes the request in-process
//! - `bridge`: forwards to the browser page over the bridge WebSocket
//! - `process`: forwards to a long-lived helper over stdin/stdout framing

pub mod bridge;
pub mod loopback;
pub mod process;

pub use bridge::BridgeInvoker;
pub use loopback::LoopbackInvoker;
pub use process::ProcessInvoker;
