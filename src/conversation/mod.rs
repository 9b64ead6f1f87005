//! The chat front: one message in, one reply out.
//!
//! Multi step flows (picking a day, then a slot, ...) remember where they are
//! through a `Pending` value stored per conversation in the session store.
mod pending;
mod router;
pub mod routes;

pub use pending::*;
pub use router::*;
