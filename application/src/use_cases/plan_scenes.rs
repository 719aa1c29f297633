//! Planning mode: build an ordered scene plan before executing.

use crate::resilience::ChatClientPool;
use stagecraft_domain::{EngineError, ExecutionPlan, Message, SceneRegistry};
use std::sync::Arc;

const PLANNER_PROMPT: &str = "You are an execution planner. Given the available scenes and a \
user request, answer with a JSON array of scene names to run in order, \
using only the listed names. Answer with the JSON array and nothing else.";

/// Builds execution plans by asking a model to sequence the registered
/// scenes for a request.
pub struct Planner {
    pool: Arc<ChatClientPool>,
}

impl Planner {
    pub fn new(pool: Arc<ChatClientPool>) -> Self {
        Self { pool }
    }

    /// Produce a plan of at most `max_depth` known scenes.
    ///
    /// Model output is filtered to registered scene names and
    /// deduplicated, so a confused model can neither invent scenes nor
    /// loop the plan. An empty result falls back to the best-match
    /// scene for the input.
    pub async fn build_plan(
        &self,
        input: &str,
        registry: &SceneRegistry,
        max_depth: usize,
    ) -> Result<ExecutionPlan, EngineError> {
        let catalog = registry
            .scenes()
            .iter()
            .map(|s| format!("- {}: {}", s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = [
            Message::system(format!("{PLANNER_PROMPT}\n\nAvailable scenes:\n{catalog}")),
            Message::user(input),
        ];

        let reply = self
            .pool
            .send(&messages, &[])
            .await
            .map_err(|e| EngineError::PlanningFailure(e.to_string()))?;

        let mut steps = Vec::new();
        for step in parse_plan_steps(&reply.reply.text_content()) {
            if registry.get(&step).is_some() && !steps.contains(&step) {
                steps.push(step);
            }
        }

        if steps.is_empty() {
            let fallback = registry.best_match(input).ok_or_else(|| {
                EngineError::PlanningFailure("no scenes registered".to_string())
            })?;
            steps.push(fallback.name.clone());
        }

        Ok(ExecutionPlan::new(steps).truncated_to(max_depth.max(1)))
    }
}

/// Extract candidate scene names from planner output.
///
/// Prefers an embedded JSON array; falls back to one-name-per-line with
/// list markers and quotes stripped.
pub fn parse_plan_steps(text: &str) -> Vec<String> {
    if let Some(start) = text.find('[')
        && let Some(end) = text.rfind(']')
        && start < end
        && let Ok(names) = serde_json::from_str::<Vec<String>>(&text[start..=end])
    {
        return names;
    }

    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || c == '-' || c == '*' || c == '.' || c == ' '
                })
                .trim_matches(|c| c == '"' || c == '\'' || c == ',')
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
