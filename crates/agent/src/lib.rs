//! The agent — the iterative tool-calling state machine at the center
//! of Ferrobot, plus the context builder that assembles its prompts.

pub mod context;
pub mod loop_runner;

pub use context::ContextBuilder;
pub use loop_runner::{AgentLoop, AgentLoopOptions};
