// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin WebSocket client for `kandevd`'s outward envelope protocol. One
//! connection per invocation: send a request frame, wait for the response
//! frame with the matching id, skipping over any notifications the daemon
//! interleaves on the same socket.

use anyhow::{anyhow, bail, Result};
use futures_util::{SinkExt, StreamExt};
use kandev_core::Clock;
use kandev_wire::{Envelope, FrameType};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct DaemonClient {
    stream: WsStream,
}

impl DaemonClient {
    pub async fn connect(addr: &str) -> Result<Self> {
        let url = format!("ws://{addr}/ws");
        let (stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|err| anyhow!("could not reach kandevd at {addr}: {err}"))?;
        Ok(Self { stream })
    }

    pub async fn request(&mut self, action: &str, payload: serde_json::Value) -> Result<serde_json::Value> {
        let id = nanoid::nanoid!(12);
        let envelope = Envelope::request(id.clone(), action, payload, now_ms());
        let text = serde_json::to_string(&envelope)?;
        self.stream.send(Message::Text(text.into())).await?;

        loop {
            let Some(frame) = self.stream.next().await else {
                bail!("kandevd closed the connection before responding to {action}");
            };
            let Message::Text(text) = frame? else { continue };
            let envelope: Envelope = serde_json::from_str(&text)?;
            match envelope.frame_type {
                FrameType::Response if envelope.id.as_deref() == Some(id.as_str()) => return Ok(envelope.payload),
                FrameType::Error if envelope.id.as_deref() == Some(id.as_str()) => {
                    let message = envelope.payload.get("message").and_then(|v| v.as_str()).unwrap_or("request failed");
                    bail!("{message}");
                }
                // Either a notification, or a response/error for a request
                // made earlier on this same socket — neither applies here.
                _ => continue,
            }
        }
    }
}

fn now_ms() -> u64 {
    kandev_core::SystemClock.epoch_ms()
}
