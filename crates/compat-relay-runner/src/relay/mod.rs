//! Dispatch loop: frame in, collaborator call, frame out.
//!
//! One request is processed at a time, so responses leave in request order.
//! Collaborator failures are absorbed into error envelopes; anything wrong
//! with the relay's own streams ends the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use prost::Message;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::Instrument;

use compat_relay_core::error::{RelayError, Result};
use compat_relay_core::protocol::envelope::{
    decode_request, recover_test_name, ClientCompatResponse, ClientResponseResult,
};

use crate::dispatch::{Invocation, Invoker};
use crate::obs::RelayMetrics;
use crate::transport::codec::{FrameReader, FrameWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    AwaitingFrame,
    Processing,
    /// Input ended cleanly.
    Terminated,
    /// Stopped on a fatal error.
    Failed,
}

pub struct Relay<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    invoker: Arc<dyn Invoker>,
    watchdog: Duration,
    metrics: Arc<RelayMetrics>,
    state: RelayState,
    seq: u64,
}

impl<R, W> Relay<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        reader: R,
        writer: W,
        invoker: Arc<dyn Invoker>,
        watchdog: Duration,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
            invoker,
            watchdog,
            metrics,
            state: RelayState::AwaitingFrame,
            seq: 0,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Number of frames taken off the input so far.
    pub fn processed(&self) -> u64 {
        self.seq
    }

    /// Give back the output stream, e.g. to inspect what was written.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    /// Run until the input ends (`Ok`) or a fatal error occurs (`Err`).
    pub async fn run(&mut self) -> Result<()> {
        let result = self.run_loop().await;
        match &result {
            Ok(()) => self.transition(RelayState::Terminated),
            Err(e) => {
                tracing::debug!(class = e.class().as_str(), "relay failed");
                self.transition(RelayState::Failed);
            }
        }
        result
    }

    fn transition(&mut self, next: RelayState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "relay state");
            self.state = next;
        }
    }

    async fn run_loop(&mut self) -> Result<()> {
        loop {
            self.transition(RelayState::AwaitingFrame);
            let Some(payload) = self.reader.next_frame().await? else {
                tracing::info!(frames = self.seq, "input closed");
                return Ok(());
            };

            self.transition(RelayState::Processing);
            self.seq += 1;
            self.metrics.frames_in.inc(&[]);

            let response = self.process(payload).await?;
            self.writer.write_frame(&response.encode_to_vec()).await?;
        }
    }

    async fn process(&self, payload: Bytes) -> Result<ClientCompatResponse> {
        let seq = self.seq;
        let request = match decode_request(payload.clone()) {
            Ok(request) => request,
            Err(e) => {
                let Some(test_name) = recover_test_name(&payload) else {
                    return Err(e);
                };
                tracing::warn!(test = %test_name, seq, error = %e, "malformed request");
                self.metrics.responses.inc(&[("outcome", "error")]);
                return Ok(ClientCompatResponse::failure(test_name, e.to_string()));
            }
        };

        let test_name = request.test_name.clone();
        let span = tracing::info_span!("request", test = %test_name, seq);

        async {
            let outcome = self.invoke(Invocation { request, raw: payload }).await;
            match outcome {
                Ok(result) => {
                    tracing::debug!("invocation succeeded");
                    self.metrics.responses.inc(&[("outcome", "ok")]);
                    Ok(ClientCompatResponse::success(test_name, result))
                }
                Err(e) if !e.is_fatal() => {
                    tracing::warn!(class = e.class().as_str(), error = %e, "invocation failed");
                    self.metrics
                        .invocation_errors
                        .inc(&[("class", e.class().as_str())]);
                    self.metrics.responses.inc(&[("outcome", "error")]);
                    Ok(ClientCompatResponse::failure(test_name, e.to_string()))
                }
                Err(e) => Err(e),
            }
        }
        .instrument(span)
        .await
    }

    async fn invoke(&self, call: Invocation) -> Result<ClientResponseResult> {
        let method = &call.request.method;
        if !self.invoker.supports(method) {
            return Err(RelayError::UnsupportedMethod(method.clone()));
        }

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.watchdog, self.invoker.invoke(call)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RelayError::Timeout(
                u64::try_from(self.watchdog.as_millis()).unwrap_or(u64::MAX),
            )),
        };
        self.metrics
            .invoke_duration_micros
            .observe(&[("invoker", self.invoker.name())], started.elapsed());
        outcome
    }
}
