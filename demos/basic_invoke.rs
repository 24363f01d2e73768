//! A walkthrough of the three completion modes and a for-each composite.
//!
//! This example demonstrates:
//! - Wrapping plain functions of different arities
//! - Reading arguments from workflow variables and upstream results
//! - Inline, future-returning, and callback-correlated completion
//! - Running a one-argument unit over a sequence with `InvokeForEach`
//! - Catching a missing function before anything runs

use std::time::Duration;
use taskwright::prelude::*;

// ============================================================================
// Step 1: An inline unit
// ============================================================================

fn greeting() -> std::sync::Arc<dyn Activity> {
    AdapterUnit::sync(
        |name: String, excited: bool| {
            let mark = if excited { "!" } else { "." };
            Ok::<_, Fault>(format!("Hello, {name}{mark}"))
        },
        (ArgumentSlot::variable("user_name"), ArgumentSlot::literal(true)),
    )
    .with_display_name("Greet")
    .with_result("greeting")
    .shared()
}

// ============================================================================
// Step 2: A future-returning unit
// ============================================================================

fn word_count() -> std::sync::Arc<dyn Activity> {
    AdapterUnit::future(
        |text: String, ctx: ContextHandle| async move {
            println!("[{}] counting words of {:?}", ctx.activity_name(), text);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, Fault>(text.split_whitespace().count())
        },
        (ArgumentSlot::variable("greeting"),),
    )
    .with_display_name("CountWords")
    .shared()
}

// ============================================================================
// Step 3: A callback-correlated unit inside a for-each composite
// ============================================================================

fn shout_each() -> std::sync::Arc<dyn Activity> {
    let shout = AdapterUnit::callback(
        |word: String| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let loud = word.to_uppercase();
            println!("[Shout] {loud}");
            Ok::<_, Fault>(())
        },
        (ArgumentSlot::new().required(),),
    )
    .with_delegate_name("Action")
    .shared();

    InvokeForEach::from_unit(ArgumentSlot::variable("words"), &shout)
        .with_display_name("ShoutEach")
        .shared()
}

#[tokio::main]
async fn main() -> Result<(), ActivityError> {
    // Inline
    let invoker = WorkflowInvoker::new(greeting())
        .with_config(InvokerConfig::new().with_input("user_name", "Ada".into()));
    let greeted = invoker.invoke().await?;
    println!("[Greet] {}", greeted.output);

    // Future-returning, reading the upstream result
    let invoker = WorkflowInvoker::new(word_count())
        .with_config(InvokerConfig::new().with_inputs(greeted.variables));
    let counted = invoker.invoke().await?;
    println!("[CountWords] {} word(s)", counted.output);

    // Callback-correlated, once per element
    let invoker = WorkflowInvoker::new(shout_each()).with_config(
        InvokerConfig::new().with_input("words", serde_json::json!(["one", "two", "three"])),
    );
    invoker.invoke().await?;

    // A unit without a function never runs
    let unfinished: AdapterUnit<_, ()> = AdapterUnit::new((ArgumentSlot::<i32>::literal(1),));
    match WorkflowInvoker::new(unfinished.shared()).invoke().await {
        Err(ActivityError::Validation(result)) => println!("[Validation] {result}"),
        other => println!("[Validation] unexpected: {:?}", other.map(|r| r.output)),
    }

    Ok(())
}
