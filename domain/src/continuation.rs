//! Client-tool continuations.
//!
//! When a scene invokes a tool registered as a client interaction, the
//! engine does not call a provider — it persists a serializable
//! [`ContinuationState`] snapshot, hands the opaque
//! [`ContinuationToken`] to the caller, and suspends. The resuming call
//! may arrive on a different process, so the state carries everything
//! needed to re-enter execution: the pending call, the conversation
//! snapshot, the remaining plan and the budget already spent.
//!
//! A token resolves to exactly one outstanding call and is consumed
//! exactly once; after `timeout_seconds` it expires and the state is
//! discarded.

use crate::conversation::Conversation;
use crate::provider::TokenUsage;
use crate::request::{BudgetLimits, CacheBehavior, ExecutionMode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque reference to suspended execution state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Generate a fresh random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContinuationToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContinuationToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The client tool call a continuation is waiting on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingToolCall {
    /// Provider-assigned call id, echoed back with the result
    pub call_id: String,
    pub tool_name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

/// Result delivered by the remote client when resuming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClientToolOutcome {
    Success { output: String },
    Error { message: String },
}

impl ClientToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self::Success {
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Render as a tool-result message content for the conversation
    pub fn as_tool_message(&self, tool_name: &str) -> String {
        match self {
            ClientToolOutcome::Success { output } => {
                format!("[{}] {}", tool_name, output)
            }
            ClientToolOutcome::Error { message } => {
                format!("[{}] error: {}", tool_name, message)
            }
        }
    }
}

/// Serializable snapshot of an execution suspended on a client tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationState {
    pub token: ContinuationToken,
    /// Scene that was executing when the engine suspended
    pub scene_name: String,
    pub pending_call: PendingToolCall,
    pub timeout_seconds: u64,
    /// Unix-millisecond deadline after which the token is invalid
    pub expires_at_ms: i64,
    /// Conversation at the point of suspension
    pub conversation: Conversation,
    /// Scene names still to run after the suspended one finishes
    pub remaining_plan: Vec<String>,
    pub mode: ExecutionMode,
    /// DynamicChaining re-executions already performed
    pub re_executions: u32,
    pub usage: TokenUsage,
    pub budget: BudgetLimits,
    pub cache_behavior: CacheBehavior,
    /// Cache key for the final response of the originating request
    pub result_cache_key: String,
}

impl ContinuationState {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> ContinuationState {
        ContinuationState {
            token: ContinuationToken::generate(),
            scene_name: "travel".into(),
            pending_call: PendingToolCall {
                call_id: "call_1".into(),
                tool_name: "pick_photo".into(),
                arguments: HashMap::new(),
            },
            timeout_seconds: 5,
            expires_at_ms: 10_000,
            conversation: Conversation::new(),
            remaining_plan: vec!["weather".into()],
            mode: ExecutionMode::Planning,
            re_executions: 0,
            usage: TokenUsage::default(),
            budget: BudgetLimits::unlimited(),
            cache_behavior: CacheBehavior::Default,
            result_cache_key: "stagecraft:result:abc".into(),
        }
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(ContinuationToken::generate(), ContinuationToken::generate());
    }

    #[test]
    fn expiry_check() {
        let state = sample_state();
        assert!(!state.is_expired(9_999));
        assert!(state.is_expired(10_000));
        assert!(state.is_expired(11_000));
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = sample_state();
        let json = serde_json::to_string(&state).unwrap();
        let back: ContinuationState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn outcome_renders_tool_messages() {
        assert_eq!(
            ClientToolOutcome::success("done").as_tool_message("pick_photo"),
            "[pick_photo] done"
        );
        assert_eq!(
            ClientToolOutcome::error("denied").as_tool_message("pick_photo"),
            "[pick_photo] error: denied"
        );
    }
}
