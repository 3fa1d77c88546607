//! Transport codecs.
//!
//! - Byte pipes (stdin/stdout, child process pipes) => `FrameReader` / `FrameWriter`
//!   built on the core frame parser, so every entry point shares one framing path.
//! - Bridge WebSocket messages => `Inbound`, decoded once before the session loop acts.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::extract::ws::Message;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, FramedRead};

use compat_relay_core::{
    error::{RelayError, Result},
    protocol::frame,
};

/// `tokio_util` decoder over the core frame parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = RelayError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        Ok(frame::decode_frame(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>> {
        if let Some(payload) = frame::decode_frame(src) {
            return Ok(Some(payload));
        }
        frame::check_eof(src)?;
        src.clear();
        Ok(None)
    }
}

/// Lazy, finite, strictly ordered sequence of frame payloads.
///
/// Consumed once; there is no way to rewind the underlying stream.
pub struct FrameReader<R> {
    inner: FramedRead<R, FrameCodec>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, FrameCodec),
        }
    }

    /// Next complete payload; `Ok(None)` on clean end of input.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        self.inner.next().await.transpose()
    }
}

impl<R: AsyncRead + Unpin> Stream for FrameReader<R> {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Writes one length-prefixed frame per call and flushes before returning.
pub struct FrameWriter<W> {
    inner: W,
    buf: BytesMut,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: writer,
            buf: BytesMut::new(),
        }
    }

    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        frame::encode_frame(payload, &mut self.buf)?;
        self.inner.write_all(&self.buf).await.map_err(RelayError::Write)?;
        self.inner.flush().await.map_err(RelayError::Write)?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(RelayError::Write)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Bridge socket message, decoded once.
#[derive(Debug)]
pub enum Inbound {
    /// Serialized `ClientCompatResponse` from the page.
    Reply(Bytes),
    /// The page could not run the case; text is its error message.
    PageError(String),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: Message) -> Inbound {
    match msg {
        Message::Binary(b) => Inbound::Reply(Bytes::from(b)),
        Message::Text(s) => Inbound::PageError(s),
        Message::Ping(v) => Inbound::Ping(v),
        Message::Pong(_) => Inbound::Pong,
        Message::Close(_) => Inbound::Close,
    }
}
