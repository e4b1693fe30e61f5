//! WebSocket connection relay loop.
//!
//! After the upgrade, every connection runs [`run_connection`]: it binds the
//! connection into the channel registry, then pumps frames until either side
//! disconnects. Inbound frames from relaying kinds are size-checked,
//! throttled, and fanned out to the channel's readers; reader kinds drain
//! their bounded delivery queue into the socket. The registry binding is
//! always released on the way out.

use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::throttle::{THROTTLE_WARNING, Throttle, ThrottleDecision};
use crate::app_state::AppState;
use crate::domain::Connection;

/// RFC 6455 close code for a frame exceeding the size limit.
const CLOSE_MESSAGE_TOO_BIG: u16 = 1009;

/// Runs the relay loop for one upgraded connection.
///
/// Joins the registry before any frame moves and leaves it on every exit
/// path. A writer that sends an oversized frame is closed with code 1009
/// and its frame is never forwarded; readers are never closed by the server
/// for being idle.
pub async fn run_connection(socket: WebSocket, state: AppState, conn: Connection) {
    let (handle, mut reader_rx) = state
        .registry
        .join(&conn, state.config.reader_queue_capacity)
        .await;

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut throttle = Throttle::new(state.config.throttle_rate, state.config.throttle_per_secs);

    // A zero-length tick period would panic inside tokio.
    let ping_period = Duration::from_secs(state.config.ping_interval_secs.max(1));
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + ping_period, ping_period);

    loop {
        tokio::select! {
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(msg @ (Message::Text(_) | Message::Binary(_)))) => {
                        if !conn.kind.relays_inbound() {
                            continue;
                        }
                        let size = payload_size(&msg);
                        if size == 0 {
                            continue;
                        }
                        if size > state.config.max_frame_bytes {
                            tracing::info!(conn = %conn.id, size, "oversized frame, closing writer");
                            let _ = ws_tx
                                .send(Message::Close(Some(CloseFrame {
                                    code: CLOSE_MESSAGE_TOO_BIG,
                                    reason: "frame exceeds limit".into(),
                                })))
                                .await;
                            break;
                        }
                        match throttle.check(Instant::now()) {
                            ThrottleDecision::Relay => {
                                handle.broadcast(&msg, state.config.backpressure).await;
                            }
                            ThrottleDecision::Warn => {
                                tracing::debug!(conn = %conn.id, "throttle engaged");
                                handle
                                    .broadcast(&Message::text(THROTTLE_WARNING), state.config.backpressure)
                                    .await;
                            }
                            ThrottleDecision::Drop => {}
                        }
                    }
                    // The protocol layer answers pings for us.
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(conn = %conn.id, "peer closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(conn = %conn.id, error = %e, "socket error");
                        break;
                    }
                }
            }
            delivery = next_delivery(reader_rx.as_mut()) => {
                match delivery {
                    Some(frame) => {
                        if ws_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        // Our slot was removed (lagging reader under the
                        // disconnect policy) and the queue has drained.
                        tracing::info!(conn = %conn.id, "reader slot closed, disconnecting");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.registry.leave(&handle).await;
    let connected_ms = (chrono::Utc::now() - conn.joined_at).num_milliseconds();
    tracing::debug!(conn = %conn.id, connected_ms, "connection closed");
}

/// Payload size of a data frame in bytes.
fn payload_size(msg: &Message) -> usize {
    match msg {
        Message::Text(text) => text.len(),
        Message::Binary(data) => data.len(),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => 0,
    }
}

/// Waits for the next queued delivery, or forever when the connection holds
/// no reader slot.
async fn next_delivery(rx: Option<&mut mpsc::Receiver<Message>>) -> Option<Message> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
