//! Actor executor port
//!
//! Defines how server-side tools (actors) are invoked during scene
//! execution. Implementations live outside this core; the scene
//! executor wraps every call in a timeout and maps failures to
//! `ToolSkipped` events rather than aborting the scene.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by an actor executor
#[derive(Error, Debug, Clone)]
pub enum ActorError {
    #[error("Actor '{0}' is not available")]
    NotFound(String),

    #[error("Actor '{0}' failed: {1}")]
    Failed(String, String),
}

/// Port for server-side tool execution
#[async_trait]
pub trait ActorExecutorPort: Send + Sync {
    /// Invoke an actor by (normalized) name with structured arguments
    async fn invoke(
        &self,
        actor_name: &str,
        arguments: &HashMap<String, serde_json::Value>,
    ) -> Result<String, ActorError>;
}
