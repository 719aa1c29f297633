//! Scene requests and execution modes.
//!
//! A [`SceneRequest`] is immutable for the lifetime of one execution:
//! the input message, the conversation so far, an optional mode
//! override and the budget limits that bound the whole run.

use crate::conversation::Conversation;
use crate::provider::TokenUsage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How scenes are selected and sequenced for a request.
///
/// - **Direct**: one best-match scene, run once
/// - **Planning**: the planner builds an ordered scene plan up front
/// - **DynamicChaining**: run a scene, ask the director whether to
///   continue, repeat up to the re-execution bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Direct,
    Planning,
    DynamicChaining,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Direct => write!(f, "direct"),
            ExecutionMode::Planning => write!(f, "planning"),
            ExecutionMode::DynamicChaining => write!(f, "dynamic_chaining"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(ExecutionMode::Direct),
            "planning" => Ok(ExecutionMode::Planning),
            "dynamic_chaining" | "dynamic-chaining" | "chaining" => {
                Ok(ExecutionMode::DynamicChaining)
            }
            _ => Err(format!("Invalid ExecutionMode: {}", s)),
        }
    }
}

/// Cache behavior for a scene or request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBehavior {
    /// Read before execution, write after
    #[default]
    Default,
    /// Bypass the cache entirely — never read, never write
    Avoidable,
    /// Write with no expiration
    Forever,
}

/// Hard limits on a single request's spend.
///
/// `None` means unlimited on that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetLimits {
    pub max_total_tokens: Option<u64>,
    pub max_cost: Option<f64>,
}

impl BudgetLimits {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, tokens: u64) -> Self {
        self.max_total_tokens = Some(tokens);
        self
    }

    pub fn with_max_cost(mut self, cost: f64) -> Self {
        self.max_cost = Some(cost);
        self
    }

    /// Returns a description of the breached limit, if any
    pub fn breached_by(&self, usage: &TokenUsage) -> Option<String> {
        if let Some(max) = self.max_total_tokens
            && usage.total_tokens() > max
        {
            return Some(format!(
                "token budget exceeded: {} > {}",
                usage.total_tokens(),
                max
            ));
        }
        if let Some(max) = self.max_cost
            && usage.cost > max
        {
            return Some(format!("cost budget exceeded: {:.4} > {:.4}", usage.cost, max));
        }
        None
    }
}

/// One user request entering the scene manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRequest {
    /// The input message
    pub input: String,
    /// Conversation history preceding this request
    pub history: Conversation,
    /// Per-request override of the configured default execution mode
    pub mode_override: Option<ExecutionMode>,
    /// Budget limits bounding the whole run
    pub budget: BudgetLimits,
}

impl SceneRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            history: Conversation::new(),
            mode_override: None,
            budget: BudgetLimits::unlimited(),
        }
    }

    pub fn with_history(mut self, history: Conversation) -> Self {
        self.history = history;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode_override = Some(mode);
        self
    }

    pub fn with_budget(mut self, budget: BudgetLimits) -> Self {
        self.budget = budget;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_default_is_direct() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Direct);
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("direct".parse::<ExecutionMode>().ok(), Some(ExecutionMode::Direct));
        assert_eq!(
            "planning".parse::<ExecutionMode>().ok(),
            Some(ExecutionMode::Planning)
        );
        assert_eq!(
            "dynamic-chaining".parse::<ExecutionMode>().ok(),
            Some(ExecutionMode::DynamicChaining)
        );
        assert!("unknown".parse::<ExecutionMode>().is_err());
    }

    #[test]
    fn unlimited_budget_never_breaches() {
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 1_000_000,
            cost: 99.0,
        };
        assert!(BudgetLimits::unlimited().breached_by(&usage).is_none());
    }

    #[test]
    fn token_budget_breach_is_reported() {
        let budget = BudgetLimits::unlimited().with_max_tokens(100);
        let usage = TokenUsage::new(80, 30);
        let message = budget.breached_by(&usage).unwrap();
        assert!(message.contains("token budget"));
    }

    #[test]
    fn cost_budget_breach_is_reported() {
        let budget = BudgetLimits::unlimited().with_max_cost(0.5);
        let usage = TokenUsage {
            prompt_tokens: 1,
            completion_tokens: 1,
            cost: 0.75,
        };
        assert!(budget.breached_by(&usage).unwrap().contains("cost budget"));
    }
}
