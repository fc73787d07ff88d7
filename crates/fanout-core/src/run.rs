//! Run and per-agent workspace types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{AgentId, RunId};

/// Directory under a run that holds every agent worktree.
pub const WORKTREES_DIR: &str = "worktrees";

/// One orchestration request's unit of work, backed by one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Unique run identifier.
    pub run_id: RunId,

    /// Repository root of the run.
    pub run_dir: PathBuf,

    /// True once the repository and its seed commit exist.
    pub git_initialized: bool,
}

impl Run {
    /// Directory holding the run's agent worktrees.
    pub fn worktrees_dir(&self) -> PathBuf {
        self.run_dir.join(WORKTREES_DIR)
    }

    /// Worktree directory owned by an agent.
    pub fn worktree_path(&self, agent_id: AgentId) -> PathBuf {
        self.worktrees_dir().join(agent_id.branch_name())
    }

    /// Serializable view of this run.
    pub fn info(&self) -> RunInfo {
        RunInfo {
            run_id: self.run_id.clone(),
            run_dir: self.run_dir.display().to_string(),
            git_initialized: self.git_initialized,
        }
    }
}

/// Run details echoed back in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: RunId,
    pub run_dir: String,
    pub git_initialized: bool,
}

/// An agent's isolated working directory, checked out to its own branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentWorkspace {
    pub agent_id: AgentId,
    pub branch_name: String,
    pub worktree_path: PathBuf,
}

impl AgentWorkspace {
    /// Workspace layout for an agent of the given run.
    pub fn for_agent(run: &Run, agent_id: AgentId) -> Self {
        Self {
            agent_id,
            branch_name: agent_id.branch_name(),
            worktree_path: run.worktree_path(agent_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.worktree_path
    }

    /// Serializable reference to this workspace.
    pub fn to_ref(&self) -> WorkspaceRef {
        WorkspaceRef {
            worktree_path: self.worktree_path.display().to_string(),
            branch_name: self.branch_name.clone(),
        }
    }
}

/// Workspace details reported with each outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub worktree_path: String,
    pub branch_name: String,
}
