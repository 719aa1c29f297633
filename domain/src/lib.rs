//! Domain layer for stagecraft
//!
//! This crate contains the core orchestration types and entities.
//! It has no dependencies on infrastructure concerns.
//!
//! # Core Concepts
//!
//! ## Scene
//!
//! A scene is a named unit of orchestrated work bundling server-side
//! tool providers (actors) and client-side tools for a sub-topic of a
//! conversation. Scenes are configured once at startup and read-only at
//! runtime.
//!
//! ## Execution modes
//!
//! - **Direct**: one best-match scene, run once
//! - **Planning**: an ordered scene plan built up front
//! - **DynamicChaining**: scene-by-scene, the director decides whether
//!   to continue
//!
//! ## Continuation
//!
//! A tool registered as a client interaction executes on a remote
//! device. The engine suspends with an opaque continuation token and
//! re-enters when the result is delivered via `resume`.

pub mod continuation;
pub mod conversation;
pub mod core;
pub mod plan;
pub mod provider;
pub mod request;
pub mod response;
pub mod scene;

// Re-export commonly used types
pub use continuation::{
    ClientToolOutcome, ContinuationState, ContinuationToken, PendingToolCall,
};
pub use conversation::{Conversation, Message, Role};
pub use core::EngineError;
pub use plan::ExecutionPlan;
pub use provider::{ContentBlock, ProviderReply, TokenUsage, ToolCallRequest};
pub use request::{BudgetLimits, CacheBehavior, ExecutionMode, SceneRequest};
pub use response::{AiResponse, AiResponseStatus, ResponsePayload};
pub use scene::{
    ActorDefinition, ClientInteractionDefinition, Scene, SceneError, SceneRegistry,
    SchemaProperty, SchemaType, ToolSchema, normalize_tool_name,
};
