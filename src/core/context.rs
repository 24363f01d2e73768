use crate::core::error::ActivityError;
use crate::core::slot::ArgumentSlot;
use crate::core::{NodeValue, SlotValue};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Debug, Default)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A shared, clonable "stop requested" signal.
///
/// The host raises it; units only observe it. Raising it never interrupts a
/// running delegate, it only lets cooperative delegates and the host react.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    inner: Arc<CancellationState>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the check so a concurrent `cancel` cannot be missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// What a delegate may see of its execution context when it asks for it as a
/// trailing parameter.
///
/// Owned and `'static`, so it can travel into a future that completes on any thread.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    instance_id: Uuid,
    activity: String,
    cancellation: CancellationFlag,
}

impl ContextHandle {
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn activity_name(&self) -> &str {
        &self.activity
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }
}

/// The per-instance execution environment a host hands to units.
///
/// Public variables are visible to callers of the workflow; implementation
/// variables belong to the composite that declared them and are never part of
/// the public surface. Implementation variables keep their Rust type: a value
/// written there is read back exactly as it was written, never re-encoded.
pub struct ActivityContext {
    instance_id: Uuid,
    variables: HashMap<String, NodeValue>,
    implementation_variables: HashMap<String, Box<dyn Any + Send>>,
    assigned: HashMap<Uuid, Box<dyn Any + Send>>,
    cancellation: CancellationFlag,
}

impl Default for ActivityContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityContext {
    pub fn new() -> Self {
        ActivityContext {
            instance_id: Uuid::new_v4(),
            variables: HashMap::new(),
            implementation_variables: HashMap::new(),
            assigned: HashMap::new(),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_variables(mut self, variables: HashMap<String, NodeValue>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    pub fn get(&self, name: &str) -> Option<&NodeValue> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: NodeValue) {
        self.variables.insert(name.into(), value);
    }

    /// `None` when the variable is missing or holds a different type.
    pub fn get_implementation<T: 'static>(&self, name: &str) -> Option<&T> {
        self.implementation_variables.get(name)?.downcast_ref::<T>()
    }

    pub fn has_implementation(&self, name: &str) -> bool {
        self.implementation_variables.contains_key(name)
    }

    pub fn set_implementation<T: Send + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.implementation_variables.insert(name.into(), Box::new(value));
    }

    pub fn variables(&self) -> &HashMap<String, NodeValue> {
        &self.variables
    }

    /// Consumes the context, keeping only the public variables.
    pub fn into_variables(self) -> HashMap<String, NodeValue> {
        self.variables
    }

    /// Resolves a slot against this context. See [`ArgumentSlot::resolve`].
    pub fn get_value<T: SlotValue>(&mut self, slot: &ArgumentSlot<T>) -> Result<T, ActivityError> {
        slot.resolve(self)
    }

    pub fn handle(&self, activity: &str) -> ContextHandle {
        ContextHandle {
            instance_id: self.instance_id,
            activity: activity.to_string(),
            cancellation: self.cancellation.clone(),
        }
    }

    pub(crate) fn assign_slot(&mut self, slot: Uuid, value: Box<dyn Any + Send>) {
        self.assigned.insert(slot, value);
    }

    pub(crate) fn take_assigned(&mut self, slot: &Uuid) -> Option<Box<dyn Any + Send>> {
        self.assigned.remove(slot)
    }
}
