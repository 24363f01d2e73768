//! Asynchronous bridges of the adapter unit.
//!
//! Both bridges start from the same future-returning delegate:
//! - [`future`] hands the delegate's future straight back to the host
//! - [`pending`] adapts it to a begin/end protocol keyed by a [`PendingOperation`](pending::PendingOperation)

pub mod future;
pub mod pending;
