use crate::core::validation::ValidationResult;
use thiserror::Error;

/// A fault produced by user code, kept exactly as the user produced it.
pub type Fault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by a unit to its host.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ActivityError {
    /// The unit is not configured well enough to run (missing delegate, unbound argument, wrong mode).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The registration pass reported at least one error; nothing was executed.
    #[error("validation failed: {0}")]
    Validation(ValidationResult),

    /// An argument's external source faulted while being resolved; the delegate was not invoked.
    #[error("failed to resolve argument '{slot}': {source}")]
    Resolution {
        slot: String,
        #[source]
        source: Fault,
    },

    /// The wrapped function failed. Display and source are those of the original fault.
    #[error(transparent)]
    Fault(Fault),

    /// The wrapped function panicked while running asynchronously.
    #[error("delegate panicked: {0}")]
    Panicked(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The pending operation was cancelled before it completed.
    #[error("activity cancelled")]
    Canceled,
}

impl ActivityError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ActivityError::Configuration(_) => "activity_configuration",
            ActivityError::Validation(_) => "activity_validation",
            ActivityError::Resolution { .. } => "activity_resolution",
            ActivityError::Fault(_) => "activity_fault",
            ActivityError::Panicked(_) => "activity_panicked",
            ActivityError::Serialization(_) => "activity_serialization",
            ActivityError::Canceled => "activity_canceled",
        }
    }

    /// The user's fault, if this error carries one.
    pub fn fault(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            ActivityError::Fault(fault) => Some(fault.as_ref()),
            _ => None,
        }
    }

    /// Gives the user's fault back by value, or returns `self` unchanged.
    pub fn into_fault(self) -> Result<Fault, Self> {
        match self {
            ActivityError::Fault(fault) => Ok(fault),
            other => Err(other),
        }
    }

    /// Downcasts the user's fault to its concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.fault()?.downcast_ref::<E>()
    }
}
