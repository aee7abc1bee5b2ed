//! WebSocket infrastructure for realtime decision feeds.
//!
//! Provides connection management keyed by group subscription, heartbeat
//! pings, and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
pub use manager::WsManager;
