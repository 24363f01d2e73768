//! A minimal in-process host.
//!
//! Drives the registration pass, dispatches each unit by its execution mode
//! and provides the `ForEach` iteration primitive that composites schedule.

pub mod for_each;
pub mod invoker;

pub use for_each::ForEach;
pub use invoker::{InvocationResult, InvokerConfig, Scheduler, WorkflowInvoker};
