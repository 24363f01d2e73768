use crate::core::async_impl::pending::CompletionCallback;
use crate::core::context::{ActivityContext, CancellationFlag};
use crate::core::error::ActivityError;
use crate::core::metadata::MetadataSink;
use crate::core::validation::ValidationResult;
use crate::core::{Activity, ExecutionMode, NodeValue, PendingToken, Step};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Runs a child unit to completion on behalf of its parent.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule(
        &self,
        child: Arc<dyn Activity>,
        ctx: &mut ActivityContext,
    ) -> Result<NodeValue, ActivityError>;
}

/// Inputs and cancellation for one [`WorkflowInvoker`].
#[derive(Debug, Clone, Default)]
pub struct InvokerConfig {
    pub inputs: HashMap<String, NodeValue>,
    pub cancellation: Option<CancellationFlag>,
}

impl InvokerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: impl Into<String>, value: NodeValue) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn with_inputs(mut self, inputs: HashMap<String, NodeValue>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }
}

/// What a finished invocation hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    /// The root unit's value.
    pub output: NodeValue,
    /// Public variables only; implementation variables never leave the run.
    pub variables: HashMap<String, NodeValue>,
}

/// Validates a unit tree once, then executes it one unit at a time.
pub struct WorkflowInvoker {
    root: Arc<dyn Activity>,
    config: InvokerConfig,
}

impl WorkflowInvoker {
    pub fn new(root: Arc<dyn Activity>) -> Self {
        WorkflowInvoker {
            root,
            config: InvokerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InvokerConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the registration pass over the root and everything it declares.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        register(&self.root, &MetadataSink::new(), &mut result);
        result
    }

    /// Validates, then executes the root. Nothing runs if validation reports an error.
    pub async fn invoke(&self) -> Result<InvocationResult, ActivityError> {
        let validation = self.validate();
        validation.log_summary();
        if !validation.is_safe() {
            return Err(ActivityError::Validation(validation));
        }

        let mut ctx = ActivityContext::new().with_variables(self.config.inputs.clone());
        if let Some(flag) = &self.config.cancellation {
            ctx = ctx.with_cancellation(flag.clone());
        }
        log::info!(
            "invoking '{}' (instance {})",
            self.root.display_name(),
            ctx.instance_id()
        );

        let output = self.schedule(Arc::clone(&self.root), &mut ctx).await?;
        Ok(InvocationResult {
            output,
            variables: ctx.into_variables(),
        })
    }

    async fn run_callback(
        &self,
        unit: &Arc<dyn Activity>,
        ctx: &mut ActivityContext,
    ) -> Result<NodeValue, ActivityError> {
        let (tx, mut rx) = oneshot::channel();
        let callback: CompletionCallback<NodeValue> = Box::new(move |operation: PendingToken| {
            let _ = tx.send(operation);
        });
        let state = NodeValue::String(ctx.instance_id().to_string());
        let token = unit.begin_execute(ctx, callback, Some(state))?;
        let cancellation = ctx.cancellation().clone();

        let fired = tokio::select! {
            biased;
            fired = &mut rx => fired,
            _ = cancellation.cancelled() => {
                if unit.cancel(&token) {
                    return Err(ActivityError::Canceled);
                }
                rx.await
            }
        };

        match fired {
            Ok(operation) => unit.end_execute(ctx, operation),
            // The sender is only dropped unfired when the operation was cancelled.
            Err(_) => Err(ActivityError::Canceled),
        }
    }
}

fn register(activity: &Arc<dyn Activity>, parent: &MetadataSink, result: &mut ValidationResult) {
    let mut sink = MetadataSink::for_child(parent);
    activity.cache_metadata(&mut sink);
    for child in sink.children() {
        register(child, &sink, result);
    }
    if !sink.metadata().validation.is_safe() {
        log::debug!(
            "'{}' reported {} validation error(s)",
            activity.display_name(),
            sink.metadata().validation.error_count()
        );
    }
    result.merge(&sink.metadata().validation);
}

#[async_trait]
impl Scheduler for WorkflowInvoker {
    async fn schedule(
        &self,
        child: Arc<dyn Activity>,
        ctx: &mut ActivityContext,
    ) -> Result<NodeValue, ActivityError> {
        if ctx.cancellation().is_cancelled() {
            return Err(ActivityError::Canceled);
        }

        let output = match child.mode() {
            ExecutionMode::CallbackCorrelated => self.run_callback(&child, ctx).await?,
            _ => match child.execute(ctx)? {
                Step::Completed(value) => value,
                Step::Future(future) => {
                    let cancellation = ctx.cancellation().clone();
                    tokio::select! {
                        biased;
                        outcome = future => outcome?,
                        _ = cancellation.cancelled() => return Err(ActivityError::Canceled),
                    }
                }
                Step::Schedule(next) => self.schedule(next, ctx).await?,
                Step::Iterate(mut cursor) => {
                    while let Some(body) = cursor.next_body(ctx) {
                        self.schedule(body, ctx).await?;
                    }
                    NodeValue::Null
                }
            },
        };

        if let Some(variable) = child.result_variable() {
            ctx.set(variable, output.clone());
        }
        log::debug!("'{}' completed", child.display_name());
        Ok(output)
    }
}
