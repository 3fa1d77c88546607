//! Dispatcher module exports.
//!
//! Re-exports the invoker registry and the `Invoker` trait so collaborators
//! can depend on this module directly.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, Invocation, Invoker};
