//! The stored user function of an adapter unit.
//!
//! Closures of arity 1 to 8 are erased into one shape,
//! `Fn(values_tuple, ContextHandle) -> ...`, so the rest of the crate never
//! has to care how many parameters the user wrote. A closure may take the
//! [`ContextHandle`] as an extra trailing parameter; the `M` marker on the
//! conversion traits tells the two forms apart.

use crate::core::ExecutionMode;
use crate::core::context::ContextHandle;
use crate::core::error::Fault;
use crate::core::metadata::MetadataSink;
use futures::future::{BoxFuture, FutureExt, TryFutureExt};
use std::future::Future;
use std::sync::Arc;

pub type SyncFn<V, R> = Arc<dyn Fn(V, ContextHandle) -> Result<R, Fault> + Send + Sync>;
pub type AsyncFn<V, R> =
    Arc<dyn Fn(V, ContextHandle) -> BoxFuture<'static, Result<R, Fault>> + Send + Sync>;

/// Marker: the closure takes only the argument values.
pub struct Plain;
/// Marker: the closure takes the argument values followed by a [`ContextHandle`].
pub struct WithContext;

/// Conversion of an immediate-returning closure into a [`SyncFn`].
pub trait IntoSyncDelegate<V, R, M>: Send + Sync + 'static {
    fn into_sync(self) -> SyncFn<V, R>;
}

/// Conversion of a future-returning closure into an [`AsyncFn`].
pub trait IntoAsyncDelegate<V, R, M>: Send + Sync + 'static {
    fn into_async(self) -> AsyncFn<V, R>;
}

macro_rules! impl_delegates {
    ($($T:ident $v:ident),+) => {
        impl<F, E, R, $($T),+> IntoSyncDelegate<($($T,)+), R, Plain> for F
        where
            F: Fn($($T),+) -> Result<R, E> + Send + Sync + 'static,
            E: Into<Fault>,
        {
            fn into_sync(self) -> SyncFn<($($T,)+), R> {
                Arc::new(move |($($v,)+): ($($T,)+), _ctx: ContextHandle| -> Result<R, Fault> {
                    (self)($($v),+).map_err(Into::into)
                })
            }
        }

        impl<F, E, R, $($T),+> IntoSyncDelegate<($($T,)+), R, WithContext> for F
        where
            F: Fn($($T,)+ ContextHandle) -> Result<R, E> + Send + Sync + 'static,
            E: Into<Fault>,
        {
            fn into_sync(self) -> SyncFn<($($T,)+), R> {
                Arc::new(move |($($v,)+): ($($T,)+), ctx: ContextHandle| -> Result<R, Fault> {
                    (self)($($v,)+ ctx).map_err(Into::into)
                })
            }
        }

        impl<F, Fut, E, R, $($T),+> IntoAsyncDelegate<($($T,)+), R, Plain> for F
        where
            F: Fn($($T),+) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            E: Into<Fault>,
            R: Send + 'static,
        {
            fn into_async(self) -> AsyncFn<($($T,)+), R> {
                Arc::new(
                    move |($($v,)+): ($($T,)+), _ctx: ContextHandle| -> BoxFuture<'static, Result<R, Fault>> {
                        (self)($($v),+).map_err(|e| -> Fault { e.into() }).boxed()
                    },
                )
            }
        }

        impl<F, Fut, E, R, $($T),+> IntoAsyncDelegate<($($T,)+), R, WithContext> for F
        where
            F: Fn($($T,)+ ContextHandle) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            E: Into<Fault>,
            R: Send + 'static,
        {
            fn into_async(self) -> AsyncFn<($($T,)+), R> {
                Arc::new(
                    move |($($v,)+): ($($T,)+), ctx: ContextHandle| -> BoxFuture<'static, Result<R, Fault>> {
                        (self)($($v,)+ ctx).map_err(|e| -> Fault { e.into() }).boxed()
                    },
                )
            }
        }
    };
}

impl_delegates!(T1 v1);
impl_delegates!(T1 v1, T2 v2);
impl_delegates!(T1 v1, T2 v2, T3 v3);
impl_delegates!(T1 v1, T2 v2, T3 v3, T4 v4);
impl_delegates!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5);
impl_delegates!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5, T6 v6);
impl_delegates!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5, T6 v6, T7 v7);
impl_delegates!(T1 v1, T2 v2, T3 v3, T4 v4, T5 v5, T6 v6, T7 v7, T8 v8);

pub(crate) enum DelegateFn<V, R> {
    Sync(SyncFn<V, R>),
    Async(AsyncFn<V, R>),
}

/// The user function of one adapter unit, with its arity and execution mode.
///
/// The function itself is optional until the unit is scheduled: a missing
/// function is reported by [`validate`](DelegateHandle::validate) during the
/// registration pass, never discovered by a null call at execution time.
pub struct DelegateHandle<V, R> {
    name: String,
    mode: ExecutionMode,
    arity: usize,
    func: Option<DelegateFn<V, R>>,
    supplied: usize,
}

impl<V, R> DelegateHandle<V, R> {
    pub(crate) fn empty(arity: usize) -> Self {
        DelegateHandle {
            name: "Func".to_string(),
            mode: ExecutionMode::Sync,
            arity,
            func: None,
            supplied: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_present(&self) -> bool {
        self.func.is_some()
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set(&mut self, mode: ExecutionMode, func: DelegateFn<V, R>) {
        if self.func.is_some() {
            log::warn!(
                "Warning: {} was already supplied, overwriting it with a {:?} delegate.",
                self.name,
                mode
            );
        }
        self.mode = mode;
        self.func = Some(func);
        self.supplied += 1;
    }

    pub(crate) fn func(&self) -> Option<&DelegateFn<V, R>> {
        self.func.as_ref()
    }

    /// How many times a function was supplied. Only the last one is kept.
    pub fn supplied(&self) -> usize {
        self.supplied
    }

    /// Reports `"<name> is required."` when no function was supplied, and a
    /// warning when more than one was.
    pub fn validate(&self, sink: &mut MetadataSink) {
        if self.func.is_none() {
            sink.add_validation_error(format!("{} is required.", self.name));
        } else if self.supplied > 1 {
            sink.add_validation_warning(format!(
                "{} was supplied {} times; only the last ({:?}) is kept.",
                self.name, self.supplied, self.mode
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ActivityContext;

    fn erase_sync<V, R, M>(f: impl IntoSyncDelegate<V, R, M>) -> SyncFn<V, R> {
        f.into_sync()
    }

    fn erase_async<V, R, M>(f: impl IntoAsyncDelegate<V, R, M>) -> AsyncFn<V, R> {
        f.into_async()
    }

    #[test]
    fn test_plain_sync_closure_receives_values_in_order() {
        let f = erase_sync(|a: i32, b: i32, c: i32| Ok::<_, Fault>(vec![a, b, c]));
        let handle = ActivityContext::new().handle("Join");
        assert_eq!(f((1, 2, 3), handle).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_context_closure_receives_handle() {
        let f = erase_sync(|a: i32, ctx: ContextHandle| {
            Ok::<_, Fault>(format!("{}:{}", ctx.activity_name(), a))
        });
        let handle = ActivityContext::new().handle("Echo");
        assert_eq!(f((9,), handle).unwrap(), "Echo:9");
    }

    #[test]
    fn test_user_error_becomes_fault() {
        let f = erase_sync(|_a: i32| Err::<(), _>("nope".to_string()));
        let handle = ActivityContext::new().handle("Fail");
        assert_eq!(f((1,), handle).unwrap_err().to_string(), "nope");
    }

    #[tokio::test]
    async fn test_async_closure_of_arity_eight() {
        let f = erase_async(
            |a: u8, b: u8, c: u8, d: u8, e: u8, f: u8, g: u8, h: u8| async move {
                Ok::<_, Fault>(vec![a, b, c, d, e, f, g, h])
            },
        );
        let handle = ActivityContext::new().handle("Eight");
        let out = f((1, 2, 3, 4, 5, 6, 7, 8), handle).await.unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_validate_reports_missing_function() {
        let handle: DelegateHandle<(i32,), ()> = DelegateHandle::empty(1);
        let mut sink = MetadataSink::new();
        handle.validate(&mut sink);
        let errors: Vec<&str> = sink.metadata().validation.errors().collect();
        assert_eq!(errors, vec!["Func is required."]);
    }

    #[test]
    fn test_validate_warns_when_supplied_twice() {
        let mut handle: DelegateHandle<(i32,), i32> = DelegateHandle::empty(1);
        handle.set(ExecutionMode::Sync, DelegateFn::Sync(erase_sync(|a: i32| Ok::<_, Fault>(a))));
        let mut sink = MetadataSink::new();
        handle.validate(&mut sink);
        assert!(!sink.metadata().validation.has_warnings());

        handle.set(
            ExecutionMode::FutureReturning,
            DelegateFn::Async(erase_async(|a: i32| async move { Ok::<_, Fault>(a) })),
        );
        let mut sink = MetadataSink::new();
        handle.validate(&mut sink);

        let validation = &sink.metadata().validation;
        assert!(validation.is_safe());
        assert_eq!(handle.supplied(), 2);
        assert_eq!(
            validation.issues[0].message(),
            "Func was supplied 2 times; only the last (FutureReturning) is kept."
        );
    }
}
