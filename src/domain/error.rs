use std::fmt::Display;

use thiserror::Error;

/// Failures the inbox reports to its observers. None of them is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InboxError {
    /// A fetch failed; the affected view degrades and can be retried.
    #[error("could not load {operation}: {reason}")]
    ReadFailure {
        operation: &'static str,
        reason: String,
    },
    /// A user-initiated write failed.
    #[error("could not {operation}: {reason}")]
    WriteFailure {
        operation: &'static str,
        reason: String,
    },
}

impl InboxError {
    pub fn read(operation: &'static str, reason: impl Display) -> Self {
        Self::ReadFailure {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn write(operation: &'static str, reason: impl Display) -> Self {
        Self::WriteFailure {
            operation,
            reason: reason.to_string(),
        }
    }

    pub fn is_retryable_read(&self) -> bool {
        matches!(self, Self::ReadFailure { .. })
    }
}
