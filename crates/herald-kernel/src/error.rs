//! Error types for the herald-kernel crate.
//!
//! Guard failures are contained at the kernel boundary: a [`GuardError`]
//! is logged and treated as "no match", and never aborts the queue drain.

/// A guard could not evaluate its predicate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// The guard needed a value that was missing or malformed.
    #[error("guard evaluation failed: {reason}")]
    Failed {
        /// Description of what went wrong.
        reason: String,
    },
}

impl GuardError {
    /// Shorthand for [`GuardError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Errors from kernel bookkeeping operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// No goal with the given id is owned by this agent.
    #[error("goal not found: {0}")]
    GoalNotFound(String),
}
