use crate::core::context::ActivityContext;
use crate::core::error::ActivityError;
use crate::core::metadata::MetadataSink;
use crate::core::presentation::ActivityHandler;
use crate::core::slot::ArgumentSlot;
use crate::core::unit::AdapterUnit;
use crate::core::{Activity, ExecutionMode, SlotValue, Step};
use crate::host::ForEach;
use std::sync::Arc;
use uuid::Uuid;

/// Runs a one-argument unit once per element of a sequence, in order.
///
/// The `Values` argument is read exactly once per execution and copied into
/// a variable private to this composite. The host's [`ForEach`] primitive
/// then walks that copy, handing each element to the body's only slot.
pub struct InvokeForEach<T> {
    display_name: String,
    values: ArgumentSlot<Vec<T>>,
    variable: String,
    for_each: Arc<ForEach<T>>,
}

impl<T: SlotValue> InvokeForEach<T> {
    pub fn new(mut values: ArgumentSlot<Vec<T>>, body: ActivityHandler<(T,)>) -> Self {
        values.name_if_unnamed("Values");
        let variable = format!("values#{}", Uuid::new_v4().simple());
        let source = ArgumentSlot::implementation_variable(variable.clone()).named("Values");
        InvokeForEach {
            display_name: "InvokeForEach".to_string(),
            values,
            variable,
            for_each: Arc::new(ForEach::new(source, body)),
        }
    }

    pub fn from_unit<R: SlotValue>(
        values: ArgumentSlot<Vec<T>>,
        body: &Arc<AdapterUnit<(ArgumentSlot<T>,), R>>,
    ) -> Self {
        Self::new(values, ActivityHandler::new(body))
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Name of the private variable holding the resolved sequence.
    pub fn variable_name(&self) -> &str {
        &self.variable
    }

    pub fn body(&self) -> &ActivityHandler<(T,)> {
        self.for_each.body()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl<T: SlotValue> Activity for InvokeForEach<T> {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Composite
    }

    fn cache_metadata(&self, metadata: &mut MetadataSink) {
        self.values.declare(metadata);
        metadata.add_implementation_variable(self.variable.clone());
        metadata.add_implementation_child(self.for_each.clone());
    }

    fn execute(&self, ctx: &mut ActivityContext) -> Result<Step, ActivityError> {
        let items = self.values.resolve(ctx)?;
        log::debug!(
            "'{}' iterating {} element(s) through {}",
            self.display_name,
            items.len(),
            self.variable
        );
        ctx.set_implementation(self.variable.clone(), items);
        Ok(Step::Schedule(self.for_each.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Fault;
    use serde_json::json;

    fn echo() -> Arc<AdapterUnit<(ArgumentSlot<String>,), String>> {
        AdapterUnit::sync(|s: String| Ok::<_, Fault>(s), (ArgumentSlot::new(),)).shared()
    }

    #[test]
    fn test_registration_declares_private_variable_and_child() {
        let composite = InvokeForEach::from_unit(ArgumentSlot::variable("items"), &echo());
        let mut sink = MetadataSink::new();
        composite.cache_metadata(&mut sink);

        let metadata = sink.metadata();
        assert_eq!(metadata.arguments.len(), 1);
        assert_eq!(metadata.arguments[0].name, "Values");
        assert_eq!(metadata.implementation_variables, vec![composite.variable_name()]);
        assert_eq!(metadata.implementation_children, vec!["ForEach"]);
        assert!(metadata.validation.is_safe());
    }

    #[test]
    fn test_each_composite_gets_its_own_variable() {
        let unit = echo();
        let a = InvokeForEach::from_unit(ArgumentSlot::literal(vec![]), &unit);
        let b = InvokeForEach::from_unit(ArgumentSlot::literal(vec![]), &unit);
        assert_ne!(a.variable_name(), b.variable_name());
    }

    #[test]
    fn test_execute_writes_private_variable_before_scheduling() {
        let composite = InvokeForEach::from_unit(ArgumentSlot::variable("items"), &echo());
        let mut ctx = ActivityContext::new();
        ctx.set("items", json!(["a", "b"]));

        let step = composite.execute(&mut ctx).unwrap();
        assert!(matches!(step, Step::Schedule(ref child) if child.display_name() == "ForEach"));
        assert_eq!(
            ctx.get_implementation::<Vec<String>>(composite.variable_name()),
            Some(&vec!["a".to_string(), "b".to_string()])
        );
        assert!(ctx.get(composite.variable_name()).is_none());
    }
}
