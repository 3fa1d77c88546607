//! compat-relay core: transport-agnostic framing, envelope schema, and errors.
//!
//! This crate defines the wire-level contracts shared by the runner, its
//! collaborators, and test tooling. It carries no async runtime so the same
//! frame and envelope code can be driven from any byte pipe.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `RelayError`/`Result` so a malformed frame
//! from the driver never crashes the relay process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ErrorClass, RelayError, Result};
