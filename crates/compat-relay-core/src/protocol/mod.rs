//! Protocol modules (frame + envelope).
//!
//! - Frame: `u32` big-endian length prefix followed by an opaque payload.
//! - Envelope: protobuf request/response records carried inside frames.
//!
//! All parsers are panic-free: malformed input is reported as `RelayError`
//! instead of panicking or indexing raw buffers.

pub mod envelope;
pub mod frame;
