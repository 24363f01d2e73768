pub mod async_impl;
pub mod composite;
pub mod context;
pub mod delegate;
pub mod error;
pub mod metadata;
pub mod presentation;
pub mod slot;
pub mod sync_impl;
pub mod unit;
pub mod validation;

use async_impl::pending::{CompletionCallback, PendingOperation};
use context::ActivityContext;
use error::ActivityError;
use futures::future::BoxFuture;
use metadata::MetadataSink;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// The Alias for serde_json::Value, the currency of host-visible values.
pub type NodeValue = serde_json::Value;

/// What a typed slot or result must be able to do.
pub trait SlotValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> SlotValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// The token a host holds between `begin_execute` and `end_execute`.
pub type PendingToken = Arc<PendingOperation<NodeValue>>;

/// How a unit reports completion to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Completes inside `execute`.
    Sync,
    /// `execute` hands back a future; the host awaits it.
    FutureReturning,
    /// The host calls `begin_execute`, waits for the completion callback, then `end_execute`.
    CallbackCorrelated,
    /// `execute` asks the host to schedule a child.
    Composite,
}

/// What `execute` hands back to the host.
pub enum Step {
    Completed(NodeValue),
    Future(BoxFuture<'static, Result<NodeValue, ActivityError>>),
    /// Run this child to completion; the caller completes with the child's value.
    Schedule(Arc<dyn Activity>),
    /// Run one body per element, in order, each to completion before the next.
    Iterate(Box<dyn Iteration>),
}

/// A host-driven cursor over the per-element bodies of an iteration.
pub trait Iteration: Send {
    /// Prepares the next element's body, or `None` once the sequence is exhausted.
    fn next_body(&mut self, ctx: &mut ActivityContext) -> Option<Arc<dyn Activity>>;
}

/// A schedulable unit, as the host sees it.
pub trait Activity: Send + Sync + 'static {
    fn display_name(&self) -> &str;

    fn mode(&self) -> ExecutionMode;

    /// The registration pass. Declarative only: same declarations on every call.
    fn cache_metadata(&self, metadata: &mut MetadataSink);

    /// The public variable the host writes the result into, if any.
    fn result_variable(&self) -> Option<&str> {
        None
    }

    fn execute(&self, ctx: &mut ActivityContext) -> Result<Step, ActivityError>;

    fn begin_execute(
        &self,
        _ctx: &mut ActivityContext,
        _callback: CompletionCallback<NodeValue>,
        _state: Option<NodeValue>,
    ) -> Result<PendingToken, ActivityError> {
        Err(ActivityError::Configuration(format!(
            "'{}' does not support callback-correlated execution",
            self.display_name()
        )))
    }

    /// Only called after the completion callback fired for `token`.
    fn end_execute(
        &self,
        _ctx: &mut ActivityContext,
        token: PendingToken,
    ) -> Result<NodeValue, ActivityError> {
        token.end()
    }

    /// Returns `true` if the operation was still pending; its callback will never fire.
    fn cancel(&self, token: &PendingToken) -> bool {
        token.cancel()
    }
}

pub(crate) fn to_node_value<R: Serialize>(value: R) -> Result<NodeValue, ActivityError> {
    Ok(serde_json::to_value(value)?)
}
