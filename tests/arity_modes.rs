//! Every arity from 1 to 8 in every completion mode.
//!
//! Each argument is an expression slot that records when it is read, so the
//! tests observe both the resolution order and the values the function sees.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use taskwright::prelude::*;

const MODES: [ExecutionMode; 3] = [
    ExecutionMode::Sync,
    ExecutionMode::FutureReturning,
    ExecutionMode::CallbackCorrelated,
];

fn tracked(reads: &Arc<Mutex<Vec<i64>>>, position: i64) -> ArgumentSlot<i64> {
    let reads = Arc::clone(reads);
    ArgumentSlot::expression(move |_ctx: &ActivityContext| {
        reads.lock().unwrap().push(position);
        Ok::<_, Fault>(position * 10)
    })
}

macro_rules! arity_case {
    ($name:ident; $($v:ident $pos:literal),+) => {
        #[tokio::test]
        async fn $name() {
            for mode in MODES {
                let reads = Arc::new(Mutex::new(Vec::new()));
                let calls = Arc::new(AtomicUsize::new(0));
                let slots = ($(tracked(&reads, $pos),)+);

                let counter = Arc::clone(&calls);
                let unit = match mode {
                    ExecutionMode::Sync => AdapterUnit::sync(
                        move |$($v: i64),+| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, Fault>(vec![$($v),+])
                        },
                        slots,
                    ),
                    ExecutionMode::FutureReturning => AdapterUnit::future(
                        move |$($v: i64),+| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            async move { Ok::<_, Fault>(vec![$($v),+]) }
                        },
                        slots,
                    ),
                    _ => AdapterUnit::callback(
                        move |$($v: i64),+| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            async move {
                                tokio::task::yield_now().await;
                                Ok::<_, Fault>(vec![$($v),+])
                            }
                        },
                        slots,
                    ),
                };
                assert_eq!(unit.mode(), mode);

                let result = WorkflowInvoker::new(unit.shared()).invoke().await.unwrap();

                let expected: Vec<i64> = vec![$($pos),+];
                let values: Vec<i64> = expected.iter().map(|p| p * 10).collect();
                assert_eq!(result.output, json!(values), "{mode:?}");
                assert_eq!(*reads.lock().unwrap(), expected, "{mode:?}");
                assert_eq!(calls.load(Ordering::SeqCst), 1, "{mode:?}");
            }
        }
    };
}

arity_case!(test_arity_1; a 1);
arity_case!(test_arity_2; a 1, b 2);
arity_case!(test_arity_3; a 1, b 2, c 3);
arity_case!(test_arity_4; a 1, b 2, c 3, d 4);
arity_case!(test_arity_5; a 1, b 2, c 3, d 4, e 5);
arity_case!(test_arity_6; a 1, b 2, c 3, d 4, e 5, f 6);
arity_case!(test_arity_7; a 1, b 2, c 3, d 4, e 5, f 6, g 7);
arity_case!(test_arity_8; a 1, b 2, c 3, d 4, e 5, f 6, g 7, h 8);

#[tokio::test]
async fn test_positional_names_follow_arity() {
    let single: AdapterUnit<_, ()> = AdapterUnit::new((ArgumentSlot::<i64>::new(),));
    let triple: AdapterUnit<_, ()> = AdapterUnit::new((
        ArgumentSlot::<i64>::new(),
        ArgumentSlot::<i64>::new(),
        ArgumentSlot::<i64>::new(),
    ));

    assert_eq!(single.arguments().0.name(), "Argument");
    let names = [
        triple.arguments().0.name(),
        triple.arguments().1.name(),
        triple.arguments().2.name(),
    ];
    assert_eq!(names, ["Argument1", "Argument2", "Argument3"]);
    assert_eq!(triple.display_name(), "Invoke3");
}

#[tokio::test]
async fn test_context_parameter_is_optional() {
    let unit = AdapterUnit::sync(
        |a: i64, b: i64, ctx: ContextHandle| Ok::<_, Fault>(format!("{}:{}", ctx.activity_name(), a + b)),
        (ArgumentSlot::literal(1), ArgumentSlot::literal(2)),
    )
    .with_display_name("Add")
    .shared();

    let result = WorkflowInvoker::new(unit).invoke().await.unwrap();
    assert_eq!(result.output, json!("Add:3"));
}
