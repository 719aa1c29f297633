//! Scene entities.
//!
//! A [`Scene`] is a named unit of orchestrated work bundling server-side
//! tool providers ([`ActorDefinition`]) and tools that execute on a
//! remote client ([`ClientInteractionDefinition`]). Scenes are built once
//! at configuration time and are read-only at runtime; construction
//! validates timeouts and tool-name uniqueness after normalization.

use super::schema::ToolSchema;
use crate::request::CacheBehavior;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while building scenes at configuration time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Duplicate tool name '{0}' in scene '{1}' after normalization")]
    DuplicateToolName(String, String),

    #[error("Client interaction '{0}' must have a timeout greater than zero")]
    InvalidTimeout(String),

    #[error("Scene '{0}' is already registered")]
    DuplicateScene(String),

    #[error("Tool name is empty after normalization")]
    EmptyToolName,
}

/// Normalize a tool name: trimmed, lowercased, separators collapsed to
/// underscores, everything non-alphanumeric dropped.
pub fn normalize_tool_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// A server-side tool provider invoked during scene execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDefinition {
    pub name: String,
    pub description: String,
    pub schema: ToolSchema,
}

impl ActorDefinition {
    pub fn new(name: &str, description: impl Into<String>) -> Result<Self, SceneError> {
        let name = normalize_tool_name(name);
        if name.is_empty() {
            return Err(SceneError::EmptyToolName);
        }
        Ok(Self {
            name,
            description: description.into(),
            schema: ToolSchema::new(),
        })
    }

    pub fn with_schema(mut self, schema: ToolSchema) -> Self {
        self.schema = schema;
        self
    }
}

/// A tool whose execution happens on a remote client, requiring the
/// engine to suspend and hand a continuation token to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInteractionDefinition {
    pub tool_name: String,
    pub description: String,
    pub timeout_seconds: u64,
    pub arguments_schema: Option<ToolSchema>,
}

impl ClientInteractionDefinition {
    pub fn new(
        tool_name: &str,
        description: impl Into<String>,
        timeout_seconds: u64,
    ) -> Result<Self, SceneError> {
        let tool_name = normalize_tool_name(tool_name);
        if tool_name.is_empty() {
            return Err(SceneError::EmptyToolName);
        }
        if timeout_seconds == 0 {
            return Err(SceneError::InvalidTimeout(tool_name));
        }
        Ok(Self {
            tool_name,
            description: description.into(),
            timeout_seconds,
            arguments_schema: None,
        })
    }

    pub fn with_arguments_schema(mut self, schema: ToolSchema) -> Self {
        self.arguments_schema = Some(schema);
        self
    }
}

/// A named unit of orchestrated work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    pub description: String,
    pub actors: Vec<ActorDefinition>,
    pub client_interactions: Vec<ClientInteractionDefinition>,
    /// Per-scene override of the engine-wide cache behavior
    pub cache_behavior: Option<CacheBehavior>,
}

impl Scene {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            actors: Vec::new(),
            client_interactions: Vec::new(),
            cache_behavior: None,
        }
    }

    pub fn with_actor(mut self, actor: ActorDefinition) -> Self {
        self.actors.push(actor);
        self
    }

    pub fn with_client_interaction(mut self, interaction: ClientInteractionDefinition) -> Self {
        self.client_interactions.push(interaction);
        self
    }

    pub fn with_cache_behavior(mut self, behavior: CacheBehavior) -> Self {
        self.cache_behavior = Some(behavior);
        self
    }

    /// Look up a client interaction by (normalized) tool name
    pub fn client_interaction(&self, tool_name: &str) -> Option<&ClientInteractionDefinition> {
        let normalized = normalize_tool_name(tool_name);
        self.client_interactions
            .iter()
            .find(|c| c.tool_name == normalized)
    }

    /// Look up an actor by (normalized) tool name
    pub fn actor(&self, tool_name: &str) -> Option<&ActorDefinition> {
        let normalized = normalize_tool_name(tool_name);
        self.actors.iter().find(|a| a.name == normalized)
    }

    /// Validate that all tool names are unique after normalization
    pub fn validate(&self) -> Result<(), SceneError> {
        let mut seen = HashSet::new();
        let names = self
            .actors
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.client_interactions.iter().map(|c| c.tool_name.as_str()));
        for name in names {
            if !seen.insert(name.to_string()) {
                return Err(SceneError::DuplicateToolName(
                    name.to_string(),
                    self.name.clone(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_separators() {
        assert_eq!(normalize_tool_name("  Get Weather "), "get_weather");
        assert_eq!(normalize_tool_name("pick-photo"), "pick_photo");
        assert_eq!(normalize_tool_name("Scan(QR)!"), "scanqr");
    }

    #[test]
    fn client_interaction_rejects_zero_timeout() {
        let result = ClientInteractionDefinition::new("pick_photo", "Pick a photo", 0);
        assert_eq!(
            result,
            Err(SceneError::InvalidTimeout("pick_photo".to_string()))
        );
    }

    #[test]
    fn empty_tool_name_is_rejected() {
        assert_eq!(
            ActorDefinition::new("  !! ", "broken").unwrap_err(),
            SceneError::EmptyToolName
        );
    }

    #[test]
    fn validate_detects_duplicates_across_actor_and_client_tools() {
        let scene = Scene::new("travel", "Trip planning")
            .with_actor(ActorDefinition::new("Get Weather", "Weather lookup").unwrap())
            .with_client_interaction(
                ClientInteractionDefinition::new("get-weather", "Client-side weather", 5).unwrap(),
            );

        assert!(matches!(
            scene.validate(),
            Err(SceneError::DuplicateToolName(name, _)) if name == "get_weather"
        ));
    }

    #[test]
    fn lookups_use_normalized_names() {
        let scene = Scene::new("travel", "Trip planning")
            .with_actor(ActorDefinition::new("get_weather", "Weather lookup").unwrap())
            .with_client_interaction(
                ClientInteractionDefinition::new("pick_photo", "Pick a photo", 30).unwrap(),
            );

        assert!(scene.validate().is_ok());
        assert!(scene.actor("Get Weather").is_some());
        assert!(scene.client_interaction("Pick-Photo").is_some());
        assert!(scene.client_interaction("unknown").is_none());
    }
}
