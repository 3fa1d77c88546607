//! Top-level facade crate for compat-relay.
//!
//! Re-exports the core primitives and the runner library so users can depend on a single crate.
//! `prelude` carries what a custom collaborator needs to plug into the relay loop.

pub mod core {
    pub use compat_relay_core::*;
}

pub mod runner {
    pub use compat_relay_runner::*;
}

pub mod prelude {
    pub use compat_relay_core::error::{ErrorClass, RelayError, Result};
    pub use compat_relay_core::protocol::envelope::{
        ClientCompatRequest, ClientCompatResponse, ClientResponseResult,
    };
    pub use compat_relay_runner::dispatch::{Invocation, Invoker};
    pub use compat_relay_runner::obs::RelayMetrics;
    pub use compat_relay_runner::relay::{Relay, RelayState};
}
