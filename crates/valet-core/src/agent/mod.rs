//! The agent pipeline: context assembly, orchestration, and the background
//! tasks (title synthesis, fact extraction) that run after each turn.

pub mod context;
pub mod extractor;
pub mod orchestrator;
pub mod title;

pub use context::ContextAssembler;
pub use extractor::FactExtractor;
pub use orchestrator::{Orchestrator, OrchestratorError};
