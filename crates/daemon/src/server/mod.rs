// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's outward surface: one WebSocket endpoint carrying the
//! envelope protocol, plus a bare health-check route for process
//! supervisors. Built on axum the way `CloudLLM-ai-cloudllm`'s HTTP MCP
//! adapter wires a trait-backed handler behind a small `Router`.

mod dispatch;

use crate::hub::Hub;
use crate::orchestrator::Orchestrator;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use kandev_wire::Envelope;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub hub: Hub,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/healthz", get(healthz)).route("/ws", get(ws_upgrade)).with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_upgrade(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One WebSocket connection: a per-client outbox fed both by the hub's
/// broadcast subscription and by direct request/response replies, drained
/// by a single writer task so the two sources never race on the socket.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (client_id, mut hub_updates) = state.hub.register().await;
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<Envelope>(crate::hub::CLIENT_CHANNEL_CAPACITY);

    let forward_tx = outbox_tx.clone();
    let forward_task = tokio::spawn(async move {
        while let Some(envelope) = hub_updates.recv().await {
            if forward_tx.send(envelope).await.is_err() {
                break;
            }
        }
    });

    let writer_task = tokio::spawn(async move {
        while let Some(envelope) = outbox_rx.recv().await {
            match serde_json::to_string(&envelope) {
                Ok(text) => {
                    if sink.send(WsMessage::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "failed to serialize outbound envelope"),
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        if let WsMessage::Text(text) = msg {
            if let Some(response) = dispatch::handle_frame(&state, &client_id, &text).await {
                let _ = outbox_tx.send(response).await;
            }
        }
    }

    forward_task.abort();
    state.hub.unregister(client_id).await;
    drop(outbox_tx);
    let _ = writer_task.await;
}
