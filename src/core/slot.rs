//! Typed argument slots and their positional binding for arities 1 to 8.

use crate::core::context::ActivityContext;
use crate::core::error::{ActivityError, Fault};
use crate::core::metadata::{ArgumentDescriptor, ArgumentDirection, MetadataSink};
use crate::core::SlotValue;
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A computed source. The only kind of source that can fault or have side effects.
pub type SlotExpression<T> = Arc<dyn Fn(&ActivityContext) -> Result<T, Fault> + Send + Sync>;

/// Where a slot reads its value from.
pub enum SlotSource<T> {
    Unbound,
    Literal(T),
    /// A public workflow variable, including results written by upstream units.
    Variable(String),
    /// A variable private to the composite that declared it.
    ImplementationVariable(String),
    Expression(SlotExpression<T>),
}

impl<T: Clone> Clone for SlotSource<T> {
    fn clone(&self) -> Self {
        match self {
            SlotSource::Unbound => SlotSource::Unbound,
            SlotSource::Literal(v) => SlotSource::Literal(v.clone()),
            SlotSource::Variable(name) => SlotSource::Variable(name.clone()),
            SlotSource::ImplementationVariable(name) => {
                SlotSource::ImplementationVariable(name.clone())
            }
            SlotSource::Expression(f) => SlotSource::Expression(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SlotSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotSource::Unbound => write!(f, "Unbound"),
            SlotSource::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            SlotSource::Variable(name) => f.debug_tuple("Variable").field(name).finish(),
            SlotSource::ImplementationVariable(name) => {
                f.debug_tuple("ImplementationVariable").field(name).finish()
            }
            SlotSource::Expression(_) => write!(f, "Expression(..)"),
        }
    }
}

/// A typed input placeholder, bound at composition time and read once per execution.
///
/// A slot never changes after its unit is configured. Values supplied by a
/// delegate handler live in the [`ActivityContext`] keyed by the slot's id and
/// take precedence over the bound source for exactly one read.
#[derive(Clone, Debug)]
pub struct ArgumentSlot<T> {
    id: Uuid,
    name: String,
    source: SlotSource<T>,
    required: bool,
    fallback: Option<T>,
}

impl<T: SlotValue> Default for ArgumentSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SlotValue> ArgumentSlot<T> {
    /// An unbound slot. Usable as a handler-supplied input, or with a fallback.
    pub fn new() -> Self {
        Self::with_source(SlotSource::Unbound)
    }

    pub fn literal(value: T) -> Self {
        Self::with_source(SlotSource::Literal(value))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::with_source(SlotSource::Variable(name.into()))
    }

    pub fn implementation_variable(name: impl Into<String>) -> Self {
        Self::with_source(SlotSource::ImplementationVariable(name.into()))
    }

    pub fn expression<F, E>(f: F) -> Self
    where
        F: Fn(&ActivityContext) -> Result<T, E> + Send + Sync + 'static,
        E: Into<Fault>,
    {
        Self::with_source(SlotSource::Expression(Arc::new(
            move |ctx: &ActivityContext| -> Result<T, Fault> { f(ctx).map_err(Into::into) },
        )))
    }

    fn with_source(source: SlotSource<T>) -> Self {
        ArgumentSlot {
            id: Uuid::new_v4(),
            name: String::new(),
            source,
            required: false,
            fallback: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registration reports an error if this slot ends up unbound.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declares the zero-value an unbound slot resolves to.
    pub fn with_default(mut self, value: T) -> Self {
        self.fallback = Some(value);
        self
    }

    pub fn or_default(self) -> Self
    where
        T: Default,
    {
        self.with_default(T::default())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &SlotSource<T> {
        &self.source
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.source, SlotSource::Unbound)
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub(crate) fn name_if_unnamed(&mut self, name: impl Into<String>) {
        if self.name.is_empty() {
            self.name = name.into();
        }
    }

    /// Reads the slot's value.
    ///
    /// A handler-assigned value wins and is consumed. Otherwise the bound
    /// source is read; an unbound slot yields its declared fallback or a
    /// configuration error. Never defaults silently.
    pub fn resolve(&self, ctx: &mut ActivityContext) -> Result<T, ActivityError> {
        if let Some(assigned) = ctx.take_assigned(&self.id) {
            return assigned.downcast::<T>().map(|value| *value).map_err(|_| {
                ActivityError::Configuration(format!(
                    "value assigned to argument '{}' is not a {}",
                    self.name,
                    type_name::<T>()
                ))
            });
        }

        match &self.source {
            SlotSource::Literal(value) => Ok(value.clone()),
            SlotSource::Variable(name) => match ctx.get(name) {
                Some(value) => self.decode(value.clone()),
                None => Err(self.resolution_fault(format!("variable '{name}' is not defined"))),
            },
            SlotSource::ImplementationVariable(name) => match ctx.get_implementation::<T>(name) {
                Some(value) => Ok(value.clone()),
                None if ctx.has_implementation(name) => Err(self.resolution_fault(format!(
                    "implementation variable '{name}' does not hold a {}",
                    type_name::<T>()
                ))),
                None => Err(self.resolution_fault(format!(
                    "implementation variable '{name}' is not defined"
                ))),
            },
            SlotSource::Expression(f) => f(ctx).map_err(|source| ActivityError::Resolution {
                slot: self.name.clone(),
                source,
            }),
            SlotSource::Unbound => self.fallback.clone().ok_or_else(|| {
                ActivityError::Configuration(format!("argument '{}' is not bound", self.name))
            }),
        }
    }

    fn decode(&self, value: serde_json::Value) -> Result<T, ActivityError> {
        serde_json::from_value(value).map_err(|e| ActivityError::Resolution {
            slot: self.name.clone(),
            source: Box::new(e),
        })
    }

    fn resolution_fault(&self, msg: String) -> ActivityError {
        ActivityError::Resolution {
            slot: self.name.clone(),
            source: msg.into(),
        }
    }

    /// Reports this slot as an input argument of the declaring unit.
    pub fn declare(&self, sink: &mut MetadataSink) {
        let bound = self.is_bound() || sink.is_delegate_bound(&self.id);
        sink.add_argument(ArgumentDescriptor {
            name: self.name.clone(),
            direction: ArgumentDirection::In,
            required: self.required,
            bound,
            type_name: type_name::<T>(),
        });
        if self.required && !bound {
            sink.add_validation_error(format!(
                "Value for a required activity argument '{}' was not supplied.",
                self.name
            ));
        }
    }
}

/// A fixed-size tuple of argument slots, resolved in positional order.
pub trait Arguments: Send + Sync + 'static {
    /// The tuple of resolved values handed to the delegate.
    type Values: Send + 'static;

    const ARITY: usize;

    /// Resolves every slot, first to last. Stops at the first failure.
    fn resolve(&self, ctx: &mut ActivityContext) -> Result<Self::Values, ActivityError>;

    fn declare(&self, sink: &mut MetadataSink);

    fn slot_ids(&self) -> Vec<Uuid>;

    /// Hands one value to each slot for its next read.
    fn assign(&self, ctx: &mut ActivityContext, values: Self::Values);

    /// Like [`assign`](Self::assign), checking arity and types at run time.
    /// Nothing is assigned unless every value matches.
    fn assign_erased(
        &self,
        ctx: &mut ActivityContext,
        values: Vec<Box<dyn Any + Send>>,
    ) -> Result<(), ActivityError>;

    /// Gives unnamed slots their positional names (`Argument`, or `Argument1`..`ArgumentN`).
    fn name_positions(&mut self);
}

fn take_typed<T: 'static>(
    values: &mut std::vec::IntoIter<Box<dyn Any + Send>>,
    position: usize,
) -> Result<T, ActivityError> {
    let value = values.next().ok_or_else(|| {
        ActivityError::Configuration(format!("missing value for argument {position}"))
    })?;
    value.downcast::<T>().map(|v| *v).map_err(|_| {
        ActivityError::Configuration(format!(
            "argument {position} expects a {}",
            type_name::<T>()
        ))
    })
}

macro_rules! impl_arguments {
    ($arity:expr; $($T:ident $v:ident $idx:tt),+) => {
        impl<$($T: SlotValue),+> Arguments for ($(ArgumentSlot<$T>,)+) {
            type Values = ($($T,)+);

            const ARITY: usize = $arity;

            fn resolve(&self, ctx: &mut ActivityContext) -> Result<Self::Values, ActivityError> {
                Ok(($(self.$idx.resolve(ctx)?,)+))
            }

            fn declare(&self, sink: &mut MetadataSink) {
                $(self.$idx.declare(sink);)+
            }

            fn slot_ids(&self) -> Vec<Uuid> {
                vec![$(self.$idx.id()),+]
            }

            fn assign(&self, ctx: &mut ActivityContext, values: Self::Values) {
                let ($($v,)+) = values;
                $(ctx.assign_slot(self.$idx.id(), Box::new($v));)+
            }

            fn assign_erased(
                &self,
                ctx: &mut ActivityContext,
                values: Vec<Box<dyn Any + Send>>,
            ) -> Result<(), ActivityError> {
                if values.len() != Self::ARITY {
                    return Err(ActivityError::Configuration(format!(
                        "expected {} argument(s), got {}",
                        Self::ARITY,
                        values.len()
                    )));
                }
                let mut values = values.into_iter();
                let typed = ($(take_typed::<$T>(&mut values, $idx + 1)?,)+);
                self.assign(ctx, typed);
                Ok(())
            }

            fn name_positions(&mut self) {
                $(
                    if Self::ARITY == 1 {
                        self.$idx.name_if_unnamed("Argument");
                    } else {
                        self.$idx.name_if_unnamed(format!("Argument{}", $idx + 1));
                    }
                )+
            }
        }
    };
}

impl_arguments!(1; T1 v1 0);
impl_arguments!(2; T1 v1 0, T2 v2 1);
impl_arguments!(3; T1 v1 0, T2 v2 1, T3 v3 2);
impl_arguments!(4; T1 v1 0, T2 v2 1, T3 v3 2, T4 v4 3);
impl_arguments!(5; T1 v1 0, T2 v2 1, T3 v3 2, T4 v4 3, T5 v5 4);
impl_arguments!(6; T1 v1 0, T2 v2 1, T3 v3 2, T4 v4 3, T5 v5 4, T6 v6 5);
impl_arguments!(7; T1 v1 0, T2 v2 1, T3 v3 2, T4 v4 3, T5 v5 4, T6 v6 5, T7 v7 6);
impl_arguments!(8; T1 v1 0, T2 v2 1, T3 v3 2, T4 v4 3, T5 v5 4, T6 v6 5, T7 v7 6, T8 v8 7);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_literal_and_variable_sources() {
        let mut ctx = ActivityContext::new();
        ctx.set("count", json!(7));

        let literal = ArgumentSlot::literal("hi".to_string());
        let variable: ArgumentSlot<u32> = ArgumentSlot::variable("count");

        assert_eq!(literal.resolve(&mut ctx).unwrap(), "hi");
        assert_eq!(variable.resolve(&mut ctx).unwrap(), 7);
    }

    #[test]
    fn test_missing_variable_is_a_resolution_fault() {
        let mut ctx = ActivityContext::new();
        let slot: ArgumentSlot<u32> = ArgumentSlot::variable("nope").named("Argument1");
        let err = slot.resolve(&mut ctx).unwrap_err();
        assert!(matches!(err, ActivityError::Resolution { ref slot, .. } if slot == "Argument1"));
    }

    #[test]
    fn test_mistyped_variable_is_a_resolution_fault() {
        let mut ctx = ActivityContext::new();
        ctx.set("count", json!("seven"));
        let slot: ArgumentSlot<u32> = ArgumentSlot::variable("count");
        assert!(matches!(slot.resolve(&mut ctx), Err(ActivityError::Resolution { .. })));
    }

    #[test]
    fn test_implementation_variable_is_read_without_reencoding() {
        let mut ctx = ActivityContext::new();
        ctx.set_implementation("values#1", vec![f64::INFINITY, f64::NAN]);

        let typed: ArgumentSlot<Vec<f64>> = ArgumentSlot::implementation_variable("values#1");
        let read = typed.resolve(&mut ctx).unwrap();
        assert_eq!(read[0], f64::INFINITY);
        assert!(read[1].is_nan());

        let mistyped: ArgumentSlot<Vec<i32>> =
            ArgumentSlot::implementation_variable("values#1").named("Values");
        let missing: ArgumentSlot<Vec<f64>> = ArgumentSlot::implementation_variable("values#2");
        assert!(matches!(
            mistyped.resolve(&mut ctx),
            Err(ActivityError::Resolution { ref slot, .. }) if slot == "Values"
        ));
        assert!(matches!(missing.resolve(&mut ctx), Err(ActivityError::Resolution { .. })));
    }

    #[test]
    fn test_unbound_uses_declared_fallback_only() {
        let mut ctx = ActivityContext::new();
        let plain: ArgumentSlot<i64> = ArgumentSlot::new().named("Argument");
        let defaulted: ArgumentSlot<i64> = ArgumentSlot::new().or_default();

        assert!(matches!(plain.resolve(&mut ctx), Err(ActivityError::Configuration(_))));
        assert_eq!(defaulted.resolve(&mut ctx).unwrap(), 0);
    }

    #[test]
    fn test_assigned_value_wins_once() {
        let mut ctx = ActivityContext::new();
        let slot = ArgumentSlot::literal(1_i64);
        ctx.assign_slot(slot.id(), Box::new(42_i64));

        assert_eq!(slot.resolve(&mut ctx).unwrap(), 42);
        assert_eq!(slot.resolve(&mut ctx).unwrap(), 1);
    }

    #[test]
    fn test_required_unbound_slot_reports_error() {
        let slot: ArgumentSlot<i64> = ArgumentSlot::new().named("Argument1").required();
        let mut sink = MetadataSink::new();
        slot.declare(&mut sink);

        let errors: Vec<&str> = sink.metadata().validation.errors().collect();
        assert_eq!(
            errors,
            vec!["Value for a required activity argument 'Argument1' was not supplied."]
        );
        assert!(!sink.metadata().arguments[0].bound);
    }

    #[test]
    fn test_required_slot_supplied_by_delegate_is_bound() {
        let slot: ArgumentSlot<i64> = ArgumentSlot::new().named("Argument").required();
        let mut sink = MetadataSink::new();
        sink.bind_delegate_arguments([slot.id()]);
        slot.declare(&mut sink);

        assert!(sink.metadata().validation.is_safe());
        assert!(sink.metadata().arguments[0].bound);
    }

    #[test]
    fn test_tuple_resolves_in_positional_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let tracked = |n: i32| {
            let order = Arc::clone(&order);
            ArgumentSlot::expression(move |_ctx: &ActivityContext| {
                order.lock().unwrap().push(n);
                Ok::<_, Fault>(n)
            })
        };
        let slots = (tracked(1), tracked(2), tracked(3), tracked(4));
        let mut ctx = ActivityContext::new();

        assert_eq!(slots.resolve(&mut ctx).unwrap(), (1, 2, 3, 4));
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_resolution_stops_at_first_fault() {
        let later_read = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&later_read);
        let slots = (
            ArgumentSlot::literal(1_i32),
            ArgumentSlot::expression(|_ctx: &ActivityContext| Err::<i32, _>("source offline")),
            ArgumentSlot::expression(move |_ctx: &ActivityContext| {
                *flag.lock().unwrap() = true;
                Ok::<_, Fault>(3_i32)
            }),
        );
        let mut ctx = ActivityContext::new();

        let err = slots.resolve(&mut ctx).unwrap_err();
        assert!(matches!(err, ActivityError::Resolution { .. }));
        assert!(!*later_read.lock().unwrap());
    }

    #[test]
    fn test_name_positions() {
        let mut single = (ArgumentSlot::<i32>::new(),);
        single.name_positions();
        assert_eq!(single.0.name(), "Argument");

        let mut pair = (ArgumentSlot::<i32>::new(), ArgumentSlot::<i32>::new().named("Custom"));
        pair.name_positions();
        assert_eq!(pair.0.name(), "Argument1");
        assert_eq!(pair.1.name(), "Custom");
    }

    #[test]
    fn test_assign_erased_checks_types_before_assigning() {
        let slots = (ArgumentSlot::literal(0_i32), ArgumentSlot::literal(String::new()));
        let mut ctx = ActivityContext::new();

        let wrong: Vec<Box<dyn Any + Send>> = vec![Box::new(1_i32), Box::new(2_i32)];
        assert!(slots.assign_erased(&mut ctx, wrong).is_err());
        assert_eq!(slots.resolve(&mut ctx).unwrap(), (0, String::new()));

        let right: Vec<Box<dyn Any + Send>> = vec![Box::new(1_i32), Box::new("x".to_string())];
        slots.assign_erased(&mut ctx, right).unwrap();
        assert_eq!(slots.resolve(&mut ctx).unwrap(), (1, "x".to_string()));
    }
}
