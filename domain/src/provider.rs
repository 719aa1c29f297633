//! Structured provider responses.
//!
//! A model-provider adapter answers with a [`ProviderReply`]: a list of
//! content blocks (text and/or tool-call requests) plus raw token counts.
//! The chat client pool prices the token counts with the answering
//! client's cost settings before anything downstream sees them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cumulative token and cost accounting for one request.
///
/// `cost` is zero until the chat client pool applies the selected
/// client's `TokenCostSettings`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost: f64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            cost: 0.0,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Accumulate another usage record into this one
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.cost += other.cost;
    }
}

/// A single block of content within a provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text content block from the model
    Text(String),

    /// A tool-call request from the model
    ToolUse {
        /// Provider-assigned ID for correlating tool results
        id: String,
        /// Tool name as requested by the model
        name: String,
        /// Structured arguments
        input: HashMap<String, serde_json::Value>,
    },
}

impl ContentBlock {
    /// Returns the text content if this is a `Text` block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A tool call extracted from a provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: HashMap<String, serde_json::Value>,
}

/// A structured response from a model provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    /// Content blocks in the response (text and/or tool use)
    pub content: Vec<ContentBlock>,
    /// Raw token counts reported by the provider
    pub usage: TokenUsage,
}

impl ProviderReply {
    /// Create a text-only reply
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text(text.into())],
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = TokenUsage::new(prompt_tokens, completion_tokens);
        self
    }

    /// Concatenate all `Text` content blocks into a single string
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract all `ToolUse` content blocks
    pub fn tool_calls(&self) -> Vec<ToolCallRequest> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCallRequest {
                    id: id.clone(),
                    name: name.clone(),
                    arguments: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if the response contains any tool-call requests
    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_has_no_tool_calls() {
        let reply = ProviderReply::from_text("Hello!");
        assert_eq!(reply.text_content(), "Hello!");
        assert!(!reply.has_tool_calls());
        assert!(reply.tool_calls().is_empty());
    }

    #[test]
    fn tool_calls_extraction() {
        let reply = ProviderReply {
            content: vec![
                ContentBlock::Text("Checking the weather.".to_string()),
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "get_weather".to_string(),
                    input: [("city".to_string(), serde_json::json!("Osaka"))]
                        .into_iter()
                        .collect(),
                },
            ],
            usage: TokenUsage::new(12, 7),
        };

        assert!(reply.has_tool_calls());
        assert_eq!(reply.text_content(), "Checking the weather.");

        let calls = reply.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments["city"], serde_json::json!("Osaka"));
    }

    #[test]
    fn usage_accumulation() {
        let mut total = TokenUsage::default();
        total.add(&TokenUsage::new(10, 5));
        total.add(&TokenUsage {
            prompt_tokens: 3,
            completion_tokens: 2,
            cost: 0.5,
        });

        assert_eq!(total.prompt_tokens, 13);
        assert_eq!(total.completion_tokens, 7);
        assert_eq!(total.total_tokens(), 20);
        assert!((total.cost - 0.5).abs() < f64::EPSILON);
    }
}
