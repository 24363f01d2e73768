use crate::core::async_impl::pending::{CompletionCallback, PendingOperation};
use crate::core::context::ActivityContext;
use crate::core::delegate::{
    AsyncFn, DelegateFn, DelegateHandle, IntoAsyncDelegate, IntoSyncDelegate, SyncFn,
};
use crate::core::error::ActivityError;
use crate::core::metadata::{ArgumentDescriptor, ArgumentDirection, MetadataSink};
use crate::core::slot::Arguments;
use crate::core::{
    Activity, ExecutionMode, NodeValue, PendingToken, SlotValue, Step, to_node_value,
};
use futures::future::FutureExt;
use std::any::type_name;
use std::sync::Arc;

/// One user function plus its argument slots: the genericized adapter unit.
///
/// `A` is a tuple of 1 to 8 [`ArgumentSlot`](crate::core::slot::ArgumentSlot)s,
/// `R` is the function's result (`()` for actions). The function can be
/// supplied first ([`AdapterUnit::sync`] and friends) or last
/// ([`AdapterUnit::new`] followed by `with_*_delegate`); only the last one
/// supplied is kept.
///
/// A unit is immutable once configured and may run any number of times, for
/// instance as the per-element body of an iteration. Every asynchronous run
/// gets its own [`PendingOperation`].
pub struct AdapterUnit<A: Arguments, R> {
    pub(crate) display_name: String,
    pub(crate) arguments: A,
    pub(crate) delegate: DelegateHandle<A::Values, R>,
    pub(crate) result: Option<String>,
}

impl<A: Arguments, R: SlotValue> AdapterUnit<A, R> {
    /// A unit with no function yet. Registration reports it until one is supplied.
    pub fn new(mut arguments: A) -> Self {
        arguments.name_positions();
        AdapterUnit {
            display_name: format!("Invoke{}", A::ARITY),
            arguments,
            delegate: DelegateHandle::empty(A::ARITY),
            result: None,
        }
    }

    /// A unit whose function returns immediately.
    pub fn sync<F, M>(func: F, arguments: A) -> Self
    where
        F: IntoSyncDelegate<A::Values, R, M>,
    {
        Self::new(arguments).with_sync_delegate(func)
    }

    /// A unit whose function returns a future the host awaits directly.
    pub fn future<F, M>(func: F, arguments: A) -> Self
    where
        F: IntoAsyncDelegate<A::Values, R, M>,
    {
        Self::new(arguments).with_future_delegate(func)
    }

    /// A unit whose future is bridged to the host's begin/end protocol.
    pub fn callback<F, M>(func: F, arguments: A) -> Self
    where
        F: IntoAsyncDelegate<A::Values, R, M>,
    {
        Self::new(arguments).with_callback_delegate(func)
    }

    pub fn with_sync_delegate<F, M>(mut self, func: F) -> Self
    where
        F: IntoSyncDelegate<A::Values, R, M>,
    {
        self.delegate
            .set(ExecutionMode::Sync, DelegateFn::Sync(func.into_sync()));
        self
    }

    pub fn with_future_delegate<F, M>(mut self, func: F) -> Self
    where
        F: IntoAsyncDelegate<A::Values, R, M>,
    {
        self.delegate.set(
            ExecutionMode::FutureReturning,
            DelegateFn::Async(func.into_async()),
        );
        self
    }

    pub fn with_callback_delegate<F, M>(mut self, func: F) -> Self
    where
        F: IntoAsyncDelegate<A::Values, R, M>,
    {
        self.delegate.set(
            ExecutionMode::CallbackCorrelated,
            DelegateFn::Async(func.into_async()),
        );
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Renames the delegate in validation messages (`"<name> is required."`).
    pub fn with_delegate_name(mut self, name: impl Into<String>) -> Self {
        self.delegate.set_name(name);
        self
    }

    /// Has the host write the result into the public variable `variable`.
    pub fn with_result(mut self, variable: impl Into<String>) -> Self {
        self.result = Some(variable.into());
        self
    }

    /// Wraps the unit in the shared binding its presentation views point at.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn arity(&self) -> usize {
        A::ARITY
    }

    pub fn arguments(&self) -> &A {
        &self.arguments
    }

    pub fn delegate(&self) -> &DelegateHandle<A::Values, R> {
        &self.delegate
    }

    pub(crate) fn missing_delegate(&self) -> ActivityError {
        ActivityError::Configuration(format!("{} is required.", self.delegate.name()))
    }

    pub(crate) fn sync_delegate(&self) -> Result<&SyncFn<A::Values, R>, ActivityError> {
        match self.delegate.func() {
            Some(DelegateFn::Sync(f)) => Ok(f),
            Some(DelegateFn::Async(_)) => Err(ActivityError::Configuration(format!(
                "'{}' is {:?}; it has no immediate-returning delegate",
                self.display_name,
                self.delegate.mode()
            ))),
            None => Err(self.missing_delegate()),
        }
    }

    pub(crate) fn async_delegate(&self) -> Result<&AsyncFn<A::Values, R>, ActivityError> {
        match self.delegate.func() {
            Some(DelegateFn::Async(f)) => Ok(f),
            Some(DelegateFn::Sync(_)) => Err(ActivityError::Configuration(format!(
                "'{}' is Sync; it has no future-returning delegate",
                self.display_name
            ))),
            None => Err(self.missing_delegate()),
        }
    }
}

impl<A: Arguments, R: SlotValue> Activity for AdapterUnit<A, R> {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn mode(&self) -> ExecutionMode {
        self.delegate.mode()
    }

    fn cache_metadata(&self, metadata: &mut MetadataSink) {
        self.arguments.declare(metadata);
        if self.result.is_some() {
            metadata.add_argument(ArgumentDescriptor {
                name: "Result".to_string(),
                direction: ArgumentDirection::Out,
                required: false,
                bound: true,
                type_name: type_name::<R>(),
            });
        }
        self.delegate.validate(metadata);
    }

    fn result_variable(&self) -> Option<&str> {
        self.result.as_deref()
    }

    fn execute(&self, ctx: &mut ActivityContext) -> Result<Step, ActivityError> {
        log::debug!(
            "executing '{}' ({:?}, arity {})",
            self.display_name,
            self.delegate.mode(),
            A::ARITY
        );
        match self.delegate.mode() {
            ExecutionMode::Sync => {
                let value = self.run_sync(ctx)?;
                Ok(Step::Completed(to_node_value(value)?))
            }
            ExecutionMode::FutureReturning => {
                let future = self.execute_future(ctx)?;
                Ok(Step::Future(
                    future.map(|outcome| outcome.and_then(to_node_value)).boxed(),
                ))
            }
            ExecutionMode::CallbackCorrelated | ExecutionMode::Composite => {
                Err(ActivityError::Configuration(format!(
                    "'{}' completes through begin_execute/end_execute",
                    self.display_name
                )))
            }
        }
    }

    fn begin_execute(
        &self,
        ctx: &mut ActivityContext,
        callback: CompletionCallback<NodeValue>,
        state: Option<NodeValue>,
    ) -> Result<PendingToken, ActivityError> {
        let future = self.start(ctx)?;
        PendingOperation::begin(
            future.map(|outcome| outcome.and_then(to_node_value)).boxed(),
            callback,
            state,
        )
    }
}
