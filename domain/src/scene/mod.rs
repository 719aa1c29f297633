//! Scenes, actors, client-side tools and their registry

pub mod entities;
pub mod registry;
pub mod schema;

pub use entities::{
    ActorDefinition, ClientInteractionDefinition, Scene, SceneError, normalize_tool_name,
};
pub use registry::SceneRegistry;
pub use schema::{SchemaProperty, SchemaType, ToolSchema};
