//! Length-prefixed frame encoding (panic-free).
//!
//! Wire layout: `length (u32, big-endian) || payload[length]`.
//!
//! Parsing rules:
//! - Never index (`buf[0]`); always use `Buf`, `get()` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.
//! - No maximum payload size is enforced here; the transport may impose one.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RelayError, Result};

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// Peek the declared payload length without consuming anything.
pub fn peek_len(src: &[u8]) -> Option<usize> {
    let mut header = src.get(..FRAME_HEADER_LEN)?;
    Some(header.get_u32() as usize)
}

/// Decode one complete frame from the front of `src`.
///
/// Returns `None` while the buffered bytes do not yet hold a full frame; in
/// that case `src` is left untouched apart from reserving room for the rest.
pub fn decode_frame(src: &mut BytesMut) -> Option<Bytes> {
    let Some(len) = peek_len(src) else {
        src.reserve(FRAME_HEADER_LEN - src.remaining());
        return None;
    };

    let total = FRAME_HEADER_LEN.saturating_add(len);
    if src.remaining() < total {
        src.reserve(total - src.remaining());
        return None;
    }

    src.advance(FRAME_HEADER_LEN);
    Some(src.split_to(len).freeze())
}

/// Classify bytes left over when the input stream has ended.
///
/// Fewer than [`FRAME_HEADER_LEN`] bytes is a clean end of input (the partial
/// header is dropped). A complete header with a short payload is a
/// [`RelayError::TruncatedFrame`].
pub fn check_eof(src: &BytesMut) -> Result<()> {
    match peek_len(src) {
        None => {
            if !src.is_empty() {
                tracing::warn!(
                    dangling = src.len(),
                    "input ended inside a length prefix; discarding partial header"
                );
            }
            Ok(())
        }
        Some(expected) => Err(RelayError::TruncatedFrame {
            expected,
            received: src.remaining() - FRAME_HEADER_LEN,
        }),
    }
}

/// Append `payload` to `dst` with its length prefix.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let len = u32::try_from(payload.len()).map_err(|_| RelayError::FrameTooLarge(payload.len()))?;
    dst.reserve(FRAME_HEADER_LEN + payload.len());
    dst.put_u32(len);
    dst.put_slice(payload);
    Ok(())
}
