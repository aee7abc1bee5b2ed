//! Decision engine orchestration.
//!
//! Pure rules live in `platepick_core`; this module sequences them with
//! persistence and event publication:
//!
//! - [`selector`]: weighted random draws against a collection's history.
//! - [`lifecycle`]: create, vote, complete, close, and list decisions.

pub mod lifecycle;
pub mod selector;
