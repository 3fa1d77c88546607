//! Bridge WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS and attach the page to the `BridgeHub`
//! - Carry one call at a time: request out as Binary, reply back as Binary
//! - Lifecycle: ping + idle timeout (suspended while a call is pending)
//! - Fail the pending call if the page goes away mid-call
//! - Close the session once its pending call is abandoned; the page reconnects

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use compat_relay_core::error::{RelayError, Result};

use crate::app_state::AppState;
use crate::bridge::BridgeCall;
use crate::transport::codec::{decode, Inbound};

const MID_CALL_CLOSE: &str = "browser session closed mid-call";

fn sys_attached_json(session: u64) -> String {
    json!({
        "v": 1,
        "svc": "sys",
        "type": "attached",
        "session": session
    })
    .to_string()
}

fn sys_error_json(code: &str, msg: &str) -> String {
    json!({
        "v": 1,
        "svc": "sys",
        "type": "error",
        "data": {
            "code": code,
            "msg": msg
        }
    })
    .to_string()
}

pub async fn bridge_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        let hub = app.bridge();
        let (session, calls) = hub.attach();
        app.metrics().bridge_sessions.inc(&[("event", "attached")]);

        let span = tracing::info_span!("bridge", session);
        async {
            tracing::info!("browser attached");
            if let Err(e) = run_bridge_session(&app, session, calls, socket).await {
                tracing::warn!(error = %e, "bridge session ended with error");
            }
            tracing::info!("browser detached");
        }
        .instrument(span)
        .await;

        hub.detach(session);
        app.metrics().bridge_sessions.inc(&[("event", "detached")]);
    })
}

async fn run_bridge_session(
    app: &AppState,
    session: u64,
    mut calls: mpsc::Receiver<BridgeCall>,
    socket: WebSocket,
) -> Result<()> {
    let (mut ws_tx, mut ws_rx) = socket.split();

    ws_tx
        .send(Message::Text(sys_attached_json(session)))
        .await
        .map_err(|e| RelayError::Internal(format!("attach notice failed: {e}")))?;

    let bridge = &app.cfg().bridge;
    let ping_every = Duration::from_millis(bridge.ping_interval_ms);
    let idle_timeout = Duration::from_millis(bridge.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut housekeeping = tokio::time::interval(Duration::from_millis(250));
    housekeeping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut pending: Option<oneshot::Sender<Result<Bytes>>> = None;
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // next call, only once the previous one has been answered
            maybe_call = calls.recv(), if pending.is_none() => {
                let Some(call) = maybe_call else {
                    tracing::info!("session retired by the hub");
                    break;
                };
                if call.reply.is_closed() {
                    // caller already gave up on it
                    continue;
                }
                if ws_tx.send(Message::Binary(call.payload.to_vec())).await.is_err() {
                    let _ = call.reply.send(Err(RelayError::Invocation(MID_CALL_CLOSE.into())));
                    break;
                }
                tracing::debug!(len = call.payload.len(), "call sent to page");
                pending = Some(call.reply);
                last_activity = Instant::now();
            }

            incoming = ws_rx.next() => {
                let Some(Ok(msg)) = incoming else { break; };
                last_activity = Instant::now();

                match decode(msg) {
                    Inbound::Reply(bytes) => match pending.take() {
                        Some(reply) => {
                            if reply.send(Ok(bytes)).is_err() {
                                tracing::debug!("late reply for an abandoned call; dropped");
                            }
                        }
                        None => tracing::warn!(len = bytes.len(), "reply with no call pending; dropped"),
                    },
                    Inbound::PageError(text) => match pending.take() {
                        Some(reply) => {
                            let _ = reply.send(Err(RelayError::Invocation(text)));
                        }
                        None => tracing::debug!(%text, "page message"),
                    },
                    Inbound::Ping(payload) => {
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Inbound::Pong => {}
                    Inbound::Close => break,
                }
            }

            _ = ping_tick.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            // abandoned call + idle timeout
            _ = housekeeping.tick() => {
                if pending.as_ref().is_some_and(|reply| reply.is_closed()) {
                    tracing::warn!("pending call abandoned; closing so the page reconnects");
                    let _ = ws_tx.send(Message::Text(sys_error_json("ABANDONED", "pending call abandoned"))).await;
                    break;
                }
                if pending.is_none() && last_activity.elapsed() >= idle_timeout {
                    let _ = ws_tx.send(Message::Text(sys_error_json("TIMEOUT", "idle timeout"))).await;
                    break;
                }
            }
        }
    }

    if let Some(reply) = pending.take() {
        let _ = reply.send(Err(RelayError::Invocation(MID_CALL_CLOSE.into())));
    }
    let _ = ws_tx.send(Message::Close(None)).await;

    Ok(())
}
