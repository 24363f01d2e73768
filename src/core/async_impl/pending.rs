//! Callback-correlated completion.
//!
//! Some hosts do not await futures. They call `begin`, park the whole
//! instance, and come back through a completion callback keyed by an opaque
//! token; only then do they call `end` to collect the value. This module
//! bridges a delegate's future onto that protocol.
//!
//! ## Guarantees
//! - The callback fires exactly once per [`PendingOperation`], or never if
//!   the operation was cancelled while still pending. The producer side is
//!   consumed by firing it, so there is no second call to make.
//! - The outcome is stored before the phase flips to completed, so `end`
//!   never observes a completed operation without its value.
//! - If the future is ready on its first poll, the callback runs before
//!   `begin` returns and [`PendingOperation::completed_synchronously`] is `true`.
//! - Nothing assumes the thread the future completes on; the token is the
//!   only identity that crosses over.

use crate::core::NodeValue;
use crate::core::error::ActivityError;
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const CANCELLED: u8 = 2;
const ENDED: u8 = 3;

/// The host's completion callback for one pending operation.
pub type CompletionCallback<R> = Box<dyn FnOnce(Arc<PendingOperation<R>>) + Send>;

/// In-flight state of one callback-correlated execution.
pub struct PendingOperation<R> {
    correlation_id: Uuid,
    state: Option<NodeValue>,
    phase: AtomicU8,
    completed_synchronously: AtomicBool,
    outcome: Mutex<Option<Result<R, ActivityError>>>,
}

impl<R: Send + 'static> PendingOperation<R> {
    fn new(state: Option<NodeValue>) -> Arc<Self> {
        Arc::new(PendingOperation {
            correlation_id: Uuid::new_v4(),
            state,
            phase: AtomicU8::new(PENDING),
            completed_synchronously: AtomicBool::new(false),
            outcome: Mutex::new(None),
        })
    }

    /// Starts `future` and returns the token the host correlates on.
    ///
    /// Polls once inline; a ready future completes before this returns.
    /// Otherwise the future is spawned on the current tokio runtime, which
    /// must exist. A panic inside the future is reported as
    /// [`ActivityError::Panicked`] so the callback still fires.
    pub fn begin(
        future: BoxFuture<'static, Result<R, ActivityError>>,
        callback: CompletionCallback<R>,
        state: Option<NodeValue>,
    ) -> Result<Arc<Self>, ActivityError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            ActivityError::Configuration(format!(
                "callback-correlated execution needs a tokio runtime: {e}"
            ))
        })?;

        let operation = Self::new(state);
        let completion = Completion {
            operation: Arc::clone(&operation),
            callback,
        };
        let mut guarded = AssertUnwindSafe(future)
            .catch_unwind()
            .map(|caught| caught.unwrap_or_else(|panic| Err(panicked(panic))))
            .boxed();

        match (&mut guarded).now_or_never() {
            Some(outcome) => {
                operation
                    .completed_synchronously
                    .store(true, Ordering::Release);
                log::debug!("operation {} completed synchronously", operation.correlation_id);
                completion.fire(outcome);
            }
            None => {
                runtime.spawn(async move {
                    let outcome = guarded.await;
                    completion.fire(outcome);
                });
            }
        }
        Ok(operation)
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// The opaque state the host passed to `begin`.
    pub fn state(&self) -> Option<&NodeValue> {
        self.state.as_ref()
    }

    pub fn completed_synchronously(&self) -> bool {
        self.completed_synchronously.load(Ordering::Acquire)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.phase.load(Ordering::Acquire), COMPLETED | ENDED)
    }

    pub fn is_cancelled(&self) -> bool {
        self.phase.load(Ordering::Acquire) == CANCELLED
    }

    /// Cancels the operation if it is still pending.
    ///
    /// Returns `false` when completion got there first; the callback then
    /// fires (or already fired) as usual and `end` must still be called.
    pub fn cancel(&self) -> bool {
        let won = self
            .phase
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            log::debug!("operation {} cancelled while pending", self.correlation_id);
        } else {
            log::warn!(
                "operation {} already completed; cancellation has no effect",
                self.correlation_id
            );
        }
        won
    }

    /// Collects the outcome of a completed operation without blocking.
    ///
    /// # Panics
    /// When called before the completion callback fired, or twice. Both are
    /// bridging defects, not user errors.
    pub fn end(&self) -> Result<R, ActivityError> {
        match self
            .phase
            .compare_exchange(COMPLETED, ENDED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => self.take_outcome().unwrap_or_else(|| {
                panic!(
                    "protocol violation: operation {} completed without an outcome",
                    self.correlation_id
                )
            }),
            Err(CANCELLED) => Err(ActivityError::Canceled),
            Err(ENDED) => panic!(
                "protocol violation: end called twice for operation {}",
                self.correlation_id
            ),
            Err(_) => panic!(
                "protocol violation: end called before operation {} completed",
                self.correlation_id
            ),
        }
    }

    /// Publishes the outcome. Returns `false` if the operation was cancelled first.
    fn complete(&self, outcome: Result<R, ActivityError>) -> bool {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.phase
            .compare_exchange(PENDING, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn take_outcome(&self) -> Option<Result<R, ActivityError>> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    #[cfg(test)]
    fn has_outcome(&self) -> bool {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// The producer side of a pending operation. Firing consumes it.
struct Completion<R> {
    operation: Arc<PendingOperation<R>>,
    callback: CompletionCallback<R>,
}

impl<R: Send + 'static> Completion<R> {
    fn fire(self, outcome: Result<R, ActivityError>) {
        if let Err(err) = &outcome {
            log::error!(
                "operation {} faulted ({}): {}",
                self.operation.correlation_id,
                err.as_label(),
                err
            );
        }
        if self.operation.complete(outcome) {
            (self.callback)(self.operation);
        } else if let Some(late) = self.operation.take_outcome() {
            // A late outcome is still observed exactly once.
            log::debug!(
                "operation {} finished after cancellation; discarding {}",
                self.operation.correlation_id,
                match &late {
                    Ok(_) => "its value".to_string(),
                    Err(err) => format!("fault: {err}"),
                }
            );
        }
    }
}

fn panicked(panic: Box<dyn Any + Send>) -> ActivityError {
    let msg = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    ActivityError::Panicked(msg)
}
