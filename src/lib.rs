//! # Taskwright
//!
//! Turns plain typed functions of one to eight arguments into schedulable
//! workflow units, so a host engine can run user code without knowing its
//! arity or how it completes.
//!
//! ## Features
//!
//! - **Typed Slots**: Each argument is an [`ArgumentSlot`] bound to a literal, a variable or an expression
//! - **Three Completion Modes**: Inline, future-returning, and callback-correlated (begin/end)
//! - **Explicit Views**: A unit is handed out standalone, as a delegate handler, or as an opaque handle
//! - **Declarative Registration**: Missing functions and unbound required arguments are caught before anything runs
//! - **Composites**: [`InvokeForEach`] runs a one-argument unit over a sequence
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use taskwright::prelude::*;
//!
//! # async fn run() -> Result<(), ActivityError> {
//! // Wrap a two-argument function
//! let add = AdapterUnit::sync(
//!     |a: i64, b: i64| Ok::<_, Fault>(a + b),
//!     (ArgumentSlot::variable("a"), ArgumentSlot::literal(2)),
//! )
//! .with_result("sum")
//! .shared();
//!
//! // Validate and run it
//! let invoker = WorkflowInvoker::new(add)
//!     .with_config(InvokerConfig::new().with_input("a", 40.into()));
//! let result = invoker.invoke().await?;
//! assert_eq!(result.variables["sum"], 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`prelude`]: Commonly used types and traits (import with `use taskwright::prelude::*`)
//! - [`sync_prelude`]: Only what inline units need (import with `use taskwright::sync_prelude::*`)
//! - [`async_prelude`]: Only what future-returning and callback units need (import with `use taskwright::async_prelude::*`)

// ============================================================================
// Core and Host Modules
// ============================================================================

mod core;
mod host;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Core types
pub use crate::core::context::{ActivityContext, CancellationFlag, ContextHandle};
pub use crate::core::error::{ActivityError, Fault};
pub use crate::core::metadata::{ArgumentDescriptor, ArgumentDirection, Metadata, MetadataSink};
pub use crate::core::validation::{ValidationIssue, ValidationResult};
pub use crate::core::{Activity, ExecutionMode, Iteration, NodeValue, PendingToken, SlotValue, Step};

// Slots and delegates
pub use crate::core::delegate::{
    AsyncFn, DelegateHandle, IntoAsyncDelegate, IntoSyncDelegate, Plain, SyncFn, WithContext,
};
pub use crate::core::slot::{ArgumentSlot, Arguments, SlotExpression, SlotSource};

// Units and their views
pub use crate::core::async_impl::pending::{CompletionCallback, PendingOperation};
pub use crate::core::composite::InvokeForEach;
pub use crate::core::presentation::{ActivityHandler, OpaqueHandler, UnitView};
pub use crate::core::unit::AdapterUnit;

// Host
pub use host::{ForEach, InvocationResult, InvokerConfig, Scheduler, WorkflowInvoker};

// ============================================================================
// Prelude Modules - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything you need to build and run units.
///
/// # Example
/// ```rust
/// use taskwright::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Core
        Activity,
        ActivityContext,
        ActivityError,
        // Units
        ActivityHandler,
        AdapterUnit,
        ArgumentSlot,
        CancellationFlag,
        CompletionCallback,
        ContextHandle,
        ExecutionMode,
        Fault,
        // Host
        ForEach,
        InvocationResult,
        InvokeForEach,
        InvokerConfig,
        Iteration,
        MetadataSink,
        NodeValue,
        OpaqueHandler,
        PendingOperation,
        PendingToken,
        Scheduler,
        Step,
        UnitView,
        ValidationResult,
        WorkflowInvoker,
    };
}

/// Prelude for inline units.
///
/// # Example
/// ```rust
/// use taskwright::sync_prelude::*;
/// ```
pub mod sync_prelude {
    pub use super::{
        Activity, ActivityContext, ActivityError, AdapterUnit, ArgumentSlot, ContextHandle, Fault,
        NodeValue, Step,
    };
}

/// Prelude for future-returning and callback-correlated units.
///
/// # Example
/// ```rust
/// use taskwright::async_prelude::*;
/// ```
pub mod async_prelude {
    pub use super::{
        Activity, ActivityContext, ActivityError, AdapterUnit, ArgumentSlot, CancellationFlag,
        CompletionCallback, ContextHandle, Fault, NodeValue, PendingOperation, PendingToken,
        Scheduler, WorkflowInvoker,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;
pub use std::collections::HashMap;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
