//! The three ways a configured unit is handed to a host.
//!
//! Every view is built by an explicit factory from the same
//! `Arc<AdapterUnit<..>>`. None of them copies the unit or re-runs
//! registration, so a value assigned through a handler is read by the very
//! slots the standalone view would read.

use crate::core::context::ActivityContext;
use crate::core::error::ActivityError;
use crate::core::slot::Arguments;
use crate::core::unit::AdapterUnit;
use crate::core::{Activity, SlotValue};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

/// Typed access to a unit's argument slots.
trait SlotBinding<V>: Send + Sync {
    fn slot_ids(&self) -> Vec<Uuid>;

    fn assign(&self, ctx: &mut ActivityContext, values: V);
}

/// Untyped access to a unit's argument slots.
trait ErasedBinding: Send + Sync {
    fn slot_ids(&self) -> Vec<Uuid>;

    fn arity(&self) -> usize;

    fn assign_erased(
        &self,
        ctx: &mut ActivityContext,
        values: Vec<Box<dyn Any + Send>>,
    ) -> Result<(), ActivityError>;
}

impl<A: Arguments, R: SlotValue> SlotBinding<A::Values> for AdapterUnit<A, R> {
    fn slot_ids(&self) -> Vec<Uuid> {
        self.arguments.slot_ids()
    }

    fn assign(&self, ctx: &mut ActivityContext, values: A::Values) {
        self.arguments.assign(ctx, values);
    }
}

impl<A: Arguments, R: SlotValue> ErasedBinding for AdapterUnit<A, R> {
    fn slot_ids(&self) -> Vec<Uuid> {
        self.arguments.slot_ids()
    }

    fn arity(&self) -> usize {
        A::ARITY
    }

    fn assign_erased(
        &self,
        ctx: &mut ActivityContext,
        values: Vec<Box<dyn Any + Send>>,
    ) -> Result<(), ActivityError> {
        self.arguments.assign_erased(ctx, values)
    }
}

/// A unit used as the body of a delegate-shaped host primitive.
///
/// `invoke` fills the unit's own slots with the values the parent passes,
/// then hands back that same unit for the host to execute.
pub struct ActivityHandler<V> {
    body: Arc<dyn Activity>,
    binding: Arc<dyn SlotBinding<V>>,
    erased: Arc<dyn ErasedBinding>,
}

impl<V> Clone for ActivityHandler<V> {
    fn clone(&self) -> Self {
        ActivityHandler {
            body: Arc::clone(&self.body),
            binding: Arc::clone(&self.binding),
            erased: Arc::clone(&self.erased),
        }
    }
}

impl<V: Send + 'static> ActivityHandler<V> {
    pub fn new<A, R>(unit: &Arc<AdapterUnit<A, R>>) -> Self
    where
        A: Arguments<Values = V>,
        R: SlotValue,
    {
        let body: Arc<dyn Activity> = unit.clone();
        let binding: Arc<dyn SlotBinding<V>> = unit.clone();
        let erased: Arc<dyn ErasedBinding> = unit.clone();
        ActivityHandler {
            body,
            binding,
            erased,
        }
    }

    /// Assigns `values` to the body's slots, first to last, and returns the body.
    pub fn invoke(&self, ctx: &mut ActivityContext, values: V) -> Arc<dyn Activity> {
        self.binding.assign(ctx, values);
        Arc::clone(&self.body)
    }

    pub fn body(&self) -> &Arc<dyn Activity> {
        &self.body
    }

    /// Ids of the slots this handler supplies, in positional order.
    pub fn argument_ids(&self) -> Vec<Uuid> {
        self.binding.slot_ids()
    }

    pub fn to_opaque(&self) -> OpaqueHandler {
        OpaqueHandler {
            body: Arc::clone(&self.body),
            binding: Arc::clone(&self.erased),
        }
    }
}

/// A delegate-shaped handle whose argument types are checked at run time.
#[derive(Clone)]
pub struct OpaqueHandler {
    body: Arc<dyn Activity>,
    binding: Arc<dyn ErasedBinding>,
}

impl OpaqueHandler {
    pub fn new<A: Arguments, R: SlotValue>(unit: &Arc<AdapterUnit<A, R>>) -> Self {
        let body: Arc<dyn Activity> = unit.clone();
        let binding: Arc<dyn ErasedBinding> = unit.clone();
        OpaqueHandler { body, binding }
    }

    /// Like [`ActivityHandler::invoke`], but fails with a configuration error
    /// when the number or types of `values` do not match the slots. Nothing is
    /// assigned in that case.
    pub fn invoke(
        &self,
        ctx: &mut ActivityContext,
        values: Vec<Box<dyn Any + Send>>,
    ) -> Result<Arc<dyn Activity>, ActivityError> {
        self.binding.assign_erased(ctx, values)?;
        Ok(Arc::clone(&self.body))
    }

    pub fn arity(&self) -> usize {
        self.binding.arity()
    }

    pub fn argument_ids(&self) -> Vec<Uuid> {
        self.binding.slot_ids()
    }

    pub fn body(&self) -> &Arc<dyn Activity> {
        &self.body
    }
}

/// One presentation of a configured unit.
pub enum UnitView<V> {
    Standalone(Arc<dyn Activity>),
    Handler(ActivityHandler<V>),
    Opaque(OpaqueHandler),
}

impl<V: Send + 'static> UnitView<V> {
    pub fn standalone<A, R>(unit: &Arc<AdapterUnit<A, R>>) -> Self
    where
        A: Arguments<Values = V>,
        R: SlotValue,
    {
        UnitView::Standalone(unit.clone())
    }

    pub fn handler<A, R>(unit: &Arc<AdapterUnit<A, R>>) -> Self
    where
        A: Arguments<Values = V>,
        R: SlotValue,
    {
        UnitView::Handler(ActivityHandler::new(unit))
    }

    pub fn opaque<A, R>(unit: &Arc<AdapterUnit<A, R>>) -> Self
    where
        A: Arguments<Values = V>,
        R: SlotValue,
    {
        UnitView::Opaque(OpaqueHandler::new(unit))
    }

    /// The unit the host schedules, whichever view this is.
    pub fn activity(&self) -> &Arc<dyn Activity> {
        match self {
            UnitView::Standalone(activity) => activity,
            UnitView::Handler(handler) => handler.body(),
            UnitView::Opaque(handler) => handler.body(),
        }
    }

    /// `true` when both views point at the same unit instance.
    pub fn same_binding<W: Send + 'static>(&self, other: &UnitView<W>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(self.activity()), Arc::as_ptr(other.activity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Fault;
    use crate::core::slot::ArgumentSlot;
    use crate::core::{NodeValue, Step};
    use serde_json::json;

    type Pair = (ArgumentSlot<i64>, ArgumentSlot<String>);

    fn describe() -> Arc<AdapterUnit<Pair, String>> {
        AdapterUnit::sync(
            |n: i64, label: String| Ok::<_, Fault>(format!("{label}={n}")),
            (ArgumentSlot::variable("n"), ArgumentSlot::variable("label")),
        )
        .shared()
    }

    fn completed(step: Result<Step, ActivityError>) -> NodeValue {
        match step {
            Ok(Step::Completed(value)) => value,
            Ok(_) => panic!("expected an inline completion"),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_all_views_share_one_binding() {
        let unit = describe();
        let standalone = UnitView::standalone(&unit);
        let handler = UnitView::handler(&unit);
        let opaque = UnitView::opaque(&unit);

        assert!(standalone.same_binding(&handler));
        assert!(handler.same_binding(&opaque));
        assert!(!standalone.same_binding(&UnitView::standalone(&describe())));
    }

    #[test]
    fn test_views_produce_the_same_result_as_the_unit() {
        let unit = describe();

        let mut direct = ActivityContext::new();
        direct.set("n", json!(3));
        direct.set("label", json!("x"));
        let expected = completed(unit.execute(&mut direct));

        let mut ctx = ActivityContext::new();
        ctx.set("n", json!(3));
        ctx.set("label", json!("x"));
        let standalone = UnitView::standalone(&unit);
        assert_eq!(completed(standalone.activity().execute(&mut ctx)), expected);

        let handler = ActivityHandler::new(&unit);
        let mut ctx = ActivityContext::new();
        let body = handler.invoke(&mut ctx, (3, "x".to_string()));
        assert_eq!(completed(body.execute(&mut ctx)), expected);

        let opaque = handler.to_opaque();
        let mut ctx = ActivityContext::new();
        let body = opaque
            .invoke(&mut ctx, vec![Box::new(3_i64), Box::new("x".to_string())])
            .unwrap();
        assert_eq!(completed(body.execute(&mut ctx)), expected);
        assert_eq!(expected, json!("x=3"));
    }

    #[test]
    fn test_handler_returns_the_same_instance() {
        let unit = describe();
        let handler = ActivityHandler::new(&unit);
        let mut ctx = ActivityContext::new();
        let body = handler.invoke(&mut ctx, (1, "a".to_string()));

        let expected: Arc<dyn Activity> = unit.clone();
        assert!(Arc::ptr_eq(&body, &expected));
        assert_eq!(handler.argument_ids(), unit.arguments().slot_ids());
    }

    #[test]
    fn test_opaque_rejects_mismatched_values() {
        let opaque = OpaqueHandler::new(&describe());
        let mut ctx = ActivityContext::new();
        assert_eq!(opaque.arity(), 2);

        let short: Vec<Box<dyn Any + Send>> = vec![Box::new(1_i64)];
        assert!(matches!(
            opaque.invoke(&mut ctx, short),
            Err(ActivityError::Configuration(_))
        ));

        let swapped: Vec<Box<dyn Any + Send>> = vec![Box::new("a".to_string()), Box::new(1_i64)];
        assert!(matches!(
            opaque.invoke(&mut ctx, swapped),
            Err(ActivityError::Configuration(_))
        ));
    }
}
