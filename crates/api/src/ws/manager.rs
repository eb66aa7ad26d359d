use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use vantage_core::types::Timestamp;

/// Control channel into one socket's writer task (pings and close frames).
///
/// Collaboration events travel on the room queues instead; this channel only
/// carries connection-level frames.
pub type ControlSender = mpsc::UnboundedSender<Message>;

/// Metadata for one open WebSocket connection.
pub struct WsConnection {
    pub control: ControlSender,
    pub connected_at: Timestamp,
}

/// Registry of open WebSocket connections.
///
/// Used for connection-level concerns only: liveness pings and closing every
/// socket on shutdown. Room membership lives in the collaboration hub.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection. The returned receiver yields control frames
    /// for the socket's writer task.
    pub async fn add(&self, conn_id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            control: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections
            .write()
            .await
            .insert(conn_id.to_string(), conn);
        rx
    }

    /// Unregister a connection. Unknown ids are ignored.
    pub async fn remove(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.remove(conn_id) {
            let open_for = chrono::Utc::now() - conn.connected_at;
            tracing::debug!(conn_id, open_ms = open_for.num_milliseconds(), "WebSocket unregistered");
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Ping frame to every connection. Returns how many were pinged.
    pub async fn ping_all(&self) -> usize {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.control.send(Message::Ping(Bytes::new()));
        }
        conns.len()
    }

    /// Send a Close frame to every connection, then clear the registry.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.control.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
