//! Execution plans.
//!
//! An [`ExecutionPlan`] is the ordered sequence of scene names the
//! planner produces for Planning mode. It is created per request and
//! discarded after execution; the caller (not the planner) enforces the
//! recursion-depth bound by truncating.

use serde::{Deserialize, Serialize};

/// Ordered sequence of scene names to execute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    steps: Vec<String>,
}

impl ExecutionPlan {
    pub fn new(steps: Vec<String>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Bound the plan to at most `depth` scenes.
    ///
    /// The planner itself must terminate even when the model suggests
    /// cycles; this truncation is the caller-side guarantee.
    pub fn truncated_to(mut self, depth: usize) -> Self {
        self.steps.truncate(depth);
        self
    }
}
