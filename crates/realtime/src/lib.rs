//! Client-side consumer of a group's decision feed.
//!
//! [`RealtimeClient::subscribe`] returns a [`DecisionFeed`] backed by a
//! background task that holds the group's WebSocket open, falls back to
//! HTTP polling while it is down, and reconnects with exponential backoff.
//! The view is always fed by exactly one source; see
//! [`platepick_core::sync::GroupFeedState`].

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod messages;
pub mod poller;
pub mod reconnect;

pub use client::RealtimeClient;
pub use config::RealtimeConfig;
pub use error::RealtimeError;
pub use feed::DecisionFeed;
