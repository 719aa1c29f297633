//! Engine error taxonomy.
//!
//! Every failure surfaced to a caller is normalized into one of these
//! kinds — raw provider-specific errors never escape the engine.
//! Transient provider failures are retried by the chat client pool;
//! everything else is either handled by its owning component or emitted
//! as a terminal `Error` event.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized error kinds exposed by the orchestration engine
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineError {
    #[error("Transient provider failure: {0}")]
    TransientProvider(String),

    #[error("Provider rejected the request: {0}")]
    NonTransientProvider(String),

    #[error("Rate limit denied: {0}")]
    RateLimitDenied(String),

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("Planning failed: {0}")]
    PlanningFailure(String),

    #[error("Continuation token expired")]
    ContinuationExpired,

    #[error("Continuation not found or already consumed")]
    ContinuationNotFound,

    #[error("Tool '{0}' timed out")]
    ToolTimeout(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Whether the chat client pool may retry after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::TransientProvider(_))
    }

    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }

    /// Short machine-readable kind name, stable across message changes
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::TransientProvider(_) => "transient_provider",
            EngineError::NonTransientProvider(_) => "non_transient_provider",
            EngineError::RateLimitDenied(_) => "rate_limit_denied",
            EngineError::BudgetExceeded(_) => "budget_exceeded",
            EngineError::PlanningFailure(_) => "planning_failure",
            EngineError::ContinuationExpired => "continuation_expired",
            EngineError::ContinuationNotFound => "continuation_not_found",
            EngineError::ToolTimeout(_) => "tool_timeout",
            EngineError::Cancelled => "cancelled",
        }
    }
}
