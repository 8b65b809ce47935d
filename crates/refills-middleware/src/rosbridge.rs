//! rosbridge v2 WebSocket client.
//!
//! This module provides [`RosbridgeClient`], which calls ROS services through
//! a `rosbridge_server` using the JSON protocol:
//!
//! ```text
//! → {"op": "call_service", "id": "...", "service": "/srv", "args": {...}}
//! ← {"op": "service_response", "id": "...", "values": {...}, "result": true}
//! ```
//!
//! Frames that are not the response to the pending call (topic traffic,
//! responses to other ids) are skipped.  Every call is bounded by the
//! client's timeout.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    #[error("Connection closed by rosbridge")]
    Closed,
    #[error("Service {service} failed: {message}")]
    ServiceFailed { service: String, message: String },
    #[error("Malformed rosbridge frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not start I/O runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Protocol frames
// ─────────────────────────────────────────────────────────────────────────────

/// A `call_service` request frame.
pub fn call_service_request(id: &str, service: &str, args: Value) -> Value {
    json!({
        "op": "call_service",
        "id": id,
        "service": service,
        "args": args,
    })
}

/// Extract the response values for request `id` from a text frame.
///
/// Returns `Ok(None)` for frames that belong to something else.
pub fn parse_service_response(text: &str, id: &str) -> Result<Option<Value>, BridgeError> {
    let frame: Value = serde_json::from_str(text)?;
    if frame.get("op").and_then(Value::as_str) != Some("service_response")
        || frame.get("id").and_then(Value::as_str) != Some(id)
    {
        return Ok(None);
    }
    let values = frame.get("values").cloned().unwrap_or(Value::Null);
    if frame.get("result").and_then(Value::as_bool) == Some(false) {
        let service = frame
            .get("service")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();
        let message = match values {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(BridgeError::ServiceFailed { service, message });
    }
    Ok(Some(values))
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Something that can call a ROS service and return its response values.
#[async_trait]
pub trait ServiceTransport: Send {
    async fn call_service(&mut self, service: &str, args: Value) -> Result<Value, BridgeError>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct RosbridgeClient {
    ws: WsStream,
    timeout: Duration,
}

impl RosbridgeClient {
    /// Open a WebSocket to `url` (e.g. `ws://localhost:9090`).
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let (ws, _response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| BridgeError::Timeout(format!("connection to {url}")))??;
        info!(url, "connected to rosbridge");
        Ok(Self { ws, timeout })
    }

    async fn await_response(&mut self, id: &str) -> Result<Value, BridgeError> {
        loop {
            match self.ws.next().await {
                None | Some(Ok(Message::Close(_))) => return Err(BridgeError::Closed),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => {
                    if let Some(values) = parse_service_response(text.as_str(), id)? {
                        return Ok(values);
                    }
                    debug!(id, "skipping unrelated rosbridge frame");
                }
                Some(Ok(_)) => {}
            }
        }
    }
}

#[async_trait]
impl ServiceTransport for RosbridgeClient {
    async fn call_service(&mut self, service: &str, args: Value) -> Result<Value, BridgeError> {
        let id = format!("call_service:{service}:{}", Uuid::new_v4());
        let request = call_service_request(&id, service, args);
        self.ws.send(Message::Text(request.to_string().into())).await?;

        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.await_response(&id))
            .await
            .map_err(|_| BridgeError::Timeout(format!("response from {service}")))?
    }
}
