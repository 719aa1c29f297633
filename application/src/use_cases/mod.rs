//! Use cases: the orchestration flows built on the ports.

pub mod director;
pub mod execute_scene;
pub mod plan_scenes;
pub mod run_scenes;
pub mod shared;
pub mod summarize;

pub use director::Director;
pub use execute_scene::{SceneExecutor, SceneOutcome};
pub use plan_scenes::Planner;
pub use run_scenes::{SceneManager, SceneStream};
pub use shared::RunContext;
pub use summarize::Summarizer;
