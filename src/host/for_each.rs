use crate::core::context::ActivityContext;
use crate::core::error::ActivityError;
use crate::core::metadata::MetadataSink;
use crate::core::presentation::ActivityHandler;
use crate::core::slot::ArgumentSlot;
use crate::core::{Activity, ExecutionMode, Iteration, SlotValue, Step};
use std::sync::Arc;

/// The host's iteration primitive: one body execution per element.
///
/// The body is a delegate handler, so its single slot counts as bound during
/// registration even when the unit itself leaves it unbound.
pub struct ForEach<T> {
    values: ArgumentSlot<Vec<T>>,
    body: ActivityHandler<(T,)>,
}

impl<T: SlotValue> ForEach<T> {
    pub fn new(values: ArgumentSlot<Vec<T>>, body: ActivityHandler<(T,)>) -> Self {
        ForEach { values, body }
    }

    pub fn body(&self) -> &ActivityHandler<(T,)> {
        &self.body
    }
}

impl<T: SlotValue> Activity for ForEach<T> {
    fn display_name(&self) -> &str {
        "ForEach"
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Composite
    }

    fn cache_metadata(&self, metadata: &mut MetadataSink) {
        self.values.declare(metadata);
        metadata.bind_delegate_arguments(self.body.argument_ids());
        metadata.add_delegate(Arc::clone(self.body.body()));
    }

    fn execute(&self, ctx: &mut ActivityContext) -> Result<Step, ActivityError> {
        let items = self.values.resolve(ctx)?;
        log::debug!("ForEach over {} element(s)", items.len());
        Ok(Step::Iterate(Box::new(Cursor {
            items: items.into_iter(),
            body: self.body.clone(),
        })))
    }
}

struct Cursor<T> {
    items: std::vec::IntoIter<T>,
    body: ActivityHandler<(T,)>,
}

impl<T: SlotValue> Iteration for Cursor<T> {
    fn next_body(&mut self, ctx: &mut ActivityContext) -> Option<Arc<dyn Activity>> {
        let item = self.items.next()?;
        Some(self.body.invoke(ctx, (item,)))
    }
}
