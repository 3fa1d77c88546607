//! Transport layer.
//!
//! Exposes the frame reader/writer used on byte pipes and the WebSocket
//! handler that carries calls to the browser page.

pub mod codec;
pub mod ws;
