//! WebSocket infrastructure for live collaboration.
//!
//! Provides the connection registry, heartbeat pings, and the HTTP upgrade
//! handler that runs the collaboration protocol on each connection.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::collab_handler;
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
pub use manager::WsManager;
