//! Fanout Orchestrator Library
//!
//! Runs one prompt across N agents, each in its own git worktree and branch
//! of a fresh run repository, and reports every agent's outcome.

pub mod config;
pub mod dispatcher;
pub mod git;
pub mod http;
pub mod orchestrator;
pub mod run_manager;
pub mod runner;
pub mod state;
pub mod worktree;

pub use config::{ClaudeConfig, Config, ConfigArgs};
pub use orchestrator::{OrchestrateError, Orchestrator};
pub use runner::{AgentRunner, ClaudeRunner};
pub use state::AppState;
