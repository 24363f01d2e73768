//! Synchronous bridge of the adapter unit.
//!
//! The delegate runs inline during the host's `execute` call and the unit
//! completes in that same call:
//! - [`AdapterUnit::run_sync`](crate::core::unit::AdapterUnit::run_sync) for typed callers
//! - [`Step::Completed`](crate::core::Step::Completed) for hosts

pub mod code;
