//! Agent runner capability.
//!
//! The dispatcher only sees [`AgentRunner`]: hand it a prompt and a working
//! directory, get back the agent's final text and the events it produced.
//! How and where the agent executes is up to the implementation.

mod claude;
#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use fanout_core::{AgentEvent, AgentId};

pub use claude::ClaudeRunner;

/// One agent invocation.
#[derive(Debug, Clone)]
pub struct RunnerRequest {
    pub agent_id: AgentId,
    /// Enhanced prompt.
    pub prompt: String,
    /// The agent's worktree.
    pub working_dir: PathBuf,
    /// Time the agent is allowed. Runners should enforce it themselves so
    /// a timed-out agent still reports its events; the dispatcher only
    /// steps in a short grace period later.
    pub timeout: Duration,
}

/// What a finished agent produced.
#[derive(Debug, Clone, Default)]
pub struct RunnerOutput {
    pub output: String,
    pub messages: Vec<AgentEvent>,
}

/// Why an agent invocation failed. The `Display` text becomes the `error`
/// of the agent's outcome.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("timeout: agent did not finish within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("process error: exited with code {code}: {stderr}")]
    Process { code: i32, stderr: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed output: {0}")]
    MalformedOutput(String),

    #[error("agent error: {0}")]
    AgentError(String),

    #[error("runner unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// A failed invocation: the classified reason plus whatever the agent
/// reported before it failed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunnerFailure {
    pub error: RunnerError,
    pub messages: Vec<AgentEvent>,
}

impl RunnerFailure {
    pub fn new(error: RunnerError, messages: Vec<AgentEvent>) -> Self {
        Self { error, messages }
    }
}

impl From<RunnerError> for RunnerFailure {
    fn from(error: RunnerError) -> Self {
        Self::new(error, Vec::new())
    }
}

impl RunnerError {
    /// Short classification, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Cancelled(_) => "cancelled",
            Self::Process { .. } => "process",
            Self::Transport(_) => "transport",
            Self::MalformedOutput(_) => "malformed_output",
            Self::AgentError(_) => "agent_error",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal",
        }
    }
}

/// Executes one agent in one working directory.
///
/// Dropping the future returned by [`AgentRunner::run`] must stop the agent,
/// best-effort. The dispatcher relies on this for timeouts and cancellation.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run the agent to completion. A failure carries the events observed
    /// before the agent failed.
    async fn run(&self, request: RunnerRequest) -> Result<RunnerOutput, RunnerFailure>;

    /// Check the runner can accept work before any run is created.
    fn ensure_ready(&self) -> Result<(), RunnerError> {
        Ok(())
    }

    /// Name for logs.
    fn name(&self) -> &str;
}
