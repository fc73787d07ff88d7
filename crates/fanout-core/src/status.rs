//! Status enums for agent outcomes and orchestration responses.

use serde::{Deserialize, Serialize};

/// Terminal status of one agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// The agent finished and reported success.
    Success,
    /// The agent failed, timed out, or was cancelled.
    Failed,
}

impl AgentStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Top-level status of an orchestration response.
///
/// Per-agent failures never surface here; once a run has been set up the
/// response is always `completed` and failures live in the summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[default]
    Completed,
}
