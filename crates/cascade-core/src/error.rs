//! Crate-wide error taxonomy.
//!
//! Every fallible operation in this crate returns `CascadeResult<T>`. Phase
//! boundaries (Cascade stages, Orchestrator phases, Factory operations)
//! convert lower-level failures into one of these variants rather than
//! letting raw errors propagate.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CascadeError {
    /// Configuration inconsistent (e.g. declared memory exceeds system memory).
    /// Surfaced at startup; callers should treat this as fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// No validated model satisfies a role under the given constraints.
    #[error("no model available: {0}")]
    NotAvailable(String),

    /// Invocation failed: timeout, non-zero exit, or non-2xx response.
    #[error("backend invocation failed: {0}")]
    BackendFailure(String),

    /// Model output did not conform to the expected JSON shape (Plan/Critique).
    #[error("output shape invalid: {0}")]
    Shape(String),

    /// `canLoad` rejected the request.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Cooperative cancellation. Not an error for reporting purposes.
    #[error("cancelled")]
    Cancelled,

    /// Programming errors / invariant violations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CascadeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CascadeError::Cancelled)
    }
}

pub type CascadeResult<T> = Result<T, CascadeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            CascadeError::NotAvailable("planner".into()).to_string(),
            "no model available: planner"
        );
        assert_eq!(CascadeError::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn is_cancelled_detection() {
        assert!(CascadeError::Cancelled.is_cancelled());
        assert!(!CascadeError::Internal("bug".into()).is_cancelled());
    }
}
