//! Scene registry.
//!
//! Scenes are registered before any request is served; the registry is
//! read-only afterwards. Direct mode picks exactly one scene via
//! [`SceneRegistry::best_match`], a keyword-overlap score over scene
//! names, descriptions and tool names. Ties go to the earliest
//! registration.

use super::entities::{Scene, SceneError};

/// Read-only collection of configured scenes
#[derive(Debug, Clone, Default)]
pub struct SceneRegistry {
    scenes: Vec<Scene>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scene, validating its tool-name uniqueness and that no
    /// scene with the same name exists.
    pub fn register(&mut self, scene: Scene) -> Result<(), SceneError> {
        scene.validate()?;
        if self.scenes.iter().any(|s| s.name == scene.name) {
            return Err(SceneError::DuplicateScene(scene.name));
        }
        self.scenes.push(scene);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.scenes.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Pick the scene that best matches the request input.
    ///
    /// Scoring: 3 points per input token matching the scene name, 1 per
    /// token matching the description, 2 per token matching a tool name.
    /// Falls back to the first registered scene when nothing scores.
    pub fn best_match(&self, input: &str) -> Option<&Scene> {
        if self.scenes.is_empty() {
            return None;
        }

        let tokens = tokenize(input);
        let mut best: (usize, &Scene) = (0, &self.scenes[0]);

        for scene in &self.scenes {
            let name_tokens = tokenize(&scene.name);
            let desc_tokens = tokenize(&scene.description);
            let tool_tokens: Vec<String> = scene
                .actors
                .iter()
                .map(|a| a.name.clone())
                .chain(scene.client_interactions.iter().map(|c| c.tool_name.clone()))
                .flat_map(|n| tokenize(&n))
                .collect();

            let mut score = 0usize;
            for token in &tokens {
                if name_tokens.contains(token) {
                    score += 3;
                }
                if desc_tokens.contains(token) {
                    score += 1;
                }
                if tool_tokens.contains(token) {
                    score += 2;
                }
            }

            if score > best.0 {
                best = (score, scene);
            }
        }

        Some(best.1)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect()
}
