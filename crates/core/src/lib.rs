//! Platepick decision engine domain logic.
//!
//! Everything in this crate is pure: no I/O, no clocks, no global RNG.
//! Callers pass `now` and an RNG explicitly so the db/api layers and the
//! realtime client can share the same rules and tests can pin them down.

pub mod decision;
pub mod error;
pub mod selection;
pub mod sync;
pub mod tally;
pub mod types;
pub mod weight;
