//! Helper-process collaborator.
//!
//! The child speaks the same framing as the relay itself: one request frame
//! on its stdin, one response frame on its stdout. Its stderr is inherited
//! so its logs land next to ours.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use compat_relay_core::error::{RelayError, Result};
use compat_relay_core::protocol::envelope::{decode_response, ClientResponseResult};

use crate::dispatch::{Invocation, Invoker};
use crate::transport::codec::{FrameReader, FrameWriter};

struct ChildPipe {
    child: Child,
    reader: FrameReader<ChildStdout>,
    writer: FrameWriter<ChildStdin>,
    /// Set while a call is on the wire. Still set on the next call means the
    /// previous one was abandoned and the child may answer out of turn.
    in_flight: bool,
}

impl ChildPipe {
    fn is_reusable(&mut self) -> bool {
        !self.in_flight && matches!(self.child.try_wait(), Ok(None))
    }
}

pub struct ProcessInvoker {
    program: String,
    args: Vec<String>,
    pipe: Mutex<Option<ChildPipe>>,
}

impl ProcessInvoker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            pipe: Mutex::new(None),
        }
    }

    fn spawn(&self) -> Result<ChildPipe> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RelayError::Invocation(format!("failed to start {}: {e}", self.program)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RelayError::Internal("child stdin not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RelayError::Internal("child stdout not piped".into()))?;

        tracing::info!(program = %self.program, pid = ?child.id(), "helper process started");

        Ok(ChildPipe {
            child,
            reader: FrameReader::new(stdout),
            writer: FrameWriter::new(stdin),
            in_flight: false,
        })
    }
}

/// Pipe failures belong to the collaborator, never to the relay's own streams.
fn helper_error(e: RelayError) -> RelayError {
    match e {
        RelayError::Invocation(_) => e,
        other => RelayError::Invocation(format!("helper process: {other}")),
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn invoke(&self, call: Invocation) -> Result<ClientResponseResult> {
        let mut slot = self.pipe.lock().await;

        let reusable = match slot.as_mut() {
            Some(pipe) => pipe.is_reusable(),
            None => false,
        };
        if !reusable {
            if let Some(mut old) = slot.take() {
                tracing::warn!(abandoned = old.in_flight, "restarting helper process");
                if let Err(e) = old.child.start_kill() {
                    tracing::debug!(error = %e, "helper process already gone");
                }
            }
            *slot = Some(self.spawn()?);
        }

        let pipe = slot
            .as_mut()
            .ok_or_else(|| RelayError::Internal("helper process slot empty".into()))?;

        pipe.in_flight = true;
        pipe.writer.write_frame(&call.raw).await.map_err(helper_error)?;
        let reply = pipe
            .reader
            .next_frame()
            .await
            .map_err(helper_error)?
            .ok_or_else(|| RelayError::Invocation("helper process closed its output".into()))?;
        pipe.in_flight = false;

        decode_response(reply)?.into_outcome()
    }
}
