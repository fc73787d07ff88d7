//! Terminal result of one agent invocation.

use serde::{Deserialize, Serialize};

use crate::{AgentEvent, AgentId, AgentStatus, AgentWorkspace, WorkspaceRef};

/// What one agent produced. Built once by the dispatcher and never mutated.
///
/// `error` is present exactly when `status` is [`AgentStatus::Failed`]; use
/// the constructors to keep it that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent_id: AgentId,
    pub status: AgentStatus,
    /// The agent's final text. May be empty on failure.
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub workspace: WorkspaceRef,
    /// Intermediate events in the order they were observed.
    #[serde(default)]
    pub messages: Vec<AgentEvent>,
}

impl AgentOutcome {
    /// A successful outcome.
    pub fn success(
        workspace: &AgentWorkspace,
        output: impl Into<String>,
        messages: Vec<AgentEvent>,
    ) -> Self {
        Self {
            agent_id: workspace.agent_id,
            status: AgentStatus::Success,
            output: output.into(),
            error: None,
            workspace: workspace.to_ref(),
            messages,
        }
    }

    /// A failed outcome with a classified reason.
    pub fn failure(
        workspace: &AgentWorkspace,
        error: impl Into<String>,
        messages: Vec<AgentEvent>,
    ) -> Self {
        Self {
            agent_id: workspace.agent_id,
            status: AgentStatus::Failed,
            output: String::new(),
            error: Some(error.into()),
            workspace: workspace.to_ref(),
            messages,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
