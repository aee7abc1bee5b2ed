//! Platepick decision event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DecisionEvent`]: a lifecycle transition carrying the full decision
//!   snapshot after the change.

pub mod bus;

pub use bus::{DecisionEvent, DecisionEventKind, EventBus};
