//! Engine response events.
//!
//! Scene execution is observed as a lazy, ordered, finite sequence of
//! [`AiResponse`] events. The [`AiResponseStatus`] values form a state
//! machine:
//!
//! ```text
//! Initializing → LoadingCache → ExecutingMainActors → (Planning)?
//!   → ExecutingScene → {FunctionRequest → FunctionCompleted|ToolSkipped}*
//!   → (Summarizing)? → (DirectorDecision → ExecutingScene …)*
//!   → GeneratingFinalResponse → SavingCache → Completed
//! ```
//!
//! `AwaitingClient` suspends the sequence (a continuation token is handed
//! to the caller); `BudgetExceeded` and unrecovered `Error` are terminal,
//! as is `Completed`.

use crate::continuation::ContinuationToken;
use crate::core::EngineError;
use crate::provider::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Status of one event in the scene execution sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiResponseStatus {
    Initializing,
    LoadingCache,
    ExecutingMainActors,
    Planning,
    ExecutingScene,
    FunctionRequest,
    FunctionCompleted,
    ToolSkipped,
    Summarizing,
    DirectorDecision,
    GeneratingFinalResponse,
    SavingCache,
    Completed,
    AwaitingClient,
    BudgetExceeded,
    Error,
}

impl AiResponseStatus {
    /// Whether this status ends the event sequence.
    ///
    /// `AwaitingClient` is deliberately not terminal: the sequence pauses
    /// and may be re-entered through `resume`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AiResponseStatus::Completed
                | AiResponseStatus::BudgetExceeded
                | AiResponseStatus::Error
        )
    }
}

impl fmt::Display for AiResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AiResponseStatus::Initializing => "initializing",
            AiResponseStatus::LoadingCache => "loading_cache",
            AiResponseStatus::ExecutingMainActors => "executing_main_actors",
            AiResponseStatus::Planning => "planning",
            AiResponseStatus::ExecutingScene => "executing_scene",
            AiResponseStatus::FunctionRequest => "function_request",
            AiResponseStatus::FunctionCompleted => "function_completed",
            AiResponseStatus::ToolSkipped => "tool_skipped",
            AiResponseStatus::Summarizing => "summarizing",
            AiResponseStatus::DirectorDecision => "director_decision",
            AiResponseStatus::GeneratingFinalResponse => "generating_final_response",
            AiResponseStatus::SavingCache => "saving_cache",
            AiResponseStatus::Completed => "completed",
            AiResponseStatus::AwaitingClient => "awaiting_client",
            AiResponseStatus::BudgetExceeded => "budget_exceeded",
            AiResponseStatus::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Payload carried by a response event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// No payload beyond the status itself
    Empty,
    /// Partial or final text from the model
    Text(String),
    /// A tool invocation is starting or has finished
    Tool {
        tool_name: String,
        output: Option<String>,
    },
    /// Execution suspended on a client-side tool
    AwaitingClient {
        token: ContinuationToken,
        tool_name: String,
        arguments: HashMap<String, serde_json::Value>,
        timeout_seconds: u64,
    },
    /// Normalized error
    Failure(EngineError),
}

/// One event in the ordered response sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub status: AiResponseStatus,
    pub payload: ResponsePayload,
    /// Cumulative token/cost usage at the time of this event
    pub usage: TokenUsage,
}

impl AiResponse {
    /// Status-only event
    pub fn status(status: AiResponseStatus, usage: TokenUsage) -> Self {
        Self {
            status,
            payload: ResponsePayload::Empty,
            usage,
        }
    }

    /// Final answer text
    pub fn final_text(text: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            status: AiResponseStatus::GeneratingFinalResponse,
            payload: ResponsePayload::Text(text.into()),
            usage,
        }
    }

    pub fn tool_request(tool_name: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            status: AiResponseStatus::FunctionRequest,
            payload: ResponsePayload::Tool {
                tool_name: tool_name.into(),
                output: None,
            },
            usage,
        }
    }

    pub fn tool_completed(
        tool_name: impl Into<String>,
        output: impl Into<String>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            status: AiResponseStatus::FunctionCompleted,
            payload: ResponsePayload::Tool {
                tool_name: tool_name.into(),
                output: Some(output.into()),
            },
            usage,
        }
    }

    pub fn tool_skipped(tool_name: impl Into<String>, usage: TokenUsage) -> Self {
        Self {
            status: AiResponseStatus::ToolSkipped,
            payload: ResponsePayload::Tool {
                tool_name: tool_name.into(),
                output: None,
            },
            usage,
        }
    }

    pub fn awaiting_client(
        token: ContinuationToken,
        tool_name: impl Into<String>,
        arguments: HashMap<String, serde_json::Value>,
        timeout_seconds: u64,
        usage: TokenUsage,
    ) -> Self {
        Self {
            status: AiResponseStatus::AwaitingClient,
            payload: ResponsePayload::AwaitingClient {
                token,
                tool_name: tool_name.into(),
                arguments,
                timeout_seconds,
            },
            usage,
        }
    }

    /// Terminal error event; `BudgetExceeded` gets its dedicated status
    pub fn failure(error: EngineError, usage: TokenUsage) -> Self {
        let status = match error {
            EngineError::BudgetExceeded(_) => AiResponseStatus::BudgetExceeded,
            _ => AiResponseStatus::Error,
        };
        Self {
            status,
            payload: ResponsePayload::Failure(error),
            usage,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the text if this event carries any
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            ResponsePayload::Text(s) => Some(s),
            _ => None,
        }
    }
}
