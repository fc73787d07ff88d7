//! Per-agent branch and worktree allocation.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use fanout_core::{AgentId, AgentWorkspace, Run};

use crate::git::{GitCli, GitError};

/// Errors allocating an agent workspace. All are fatal for the request.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The agent already has a branch or directory in this run. This is a
    /// caller bug, not something to retry.
    #[error("Workspace for agent {agent_id} already exists ({what})")]
    Duplicate { agent_id: AgentId, what: &'static str },

    #[error("Failed to create workspace directory: {0}")]
    Directory(#[source] std::io::Error),

    #[error("Failed to create workspace for agent {agent_id}: {source}")]
    Git {
        agent_id: AgentId,
        #[source]
        source: GitError,
    },
}

/// Creates one branch and worktree per agent inside a run's repository.
pub struct WorktreeAllocator {
    git: Arc<GitCli>,
}

impl WorktreeAllocator {
    pub fn new(git: Arc<GitCli>) -> Self {
        Self { git }
    }

    /// Create `agent-<n>` from the run's seed commit and check it out at
    /// `worktrees/agent-<n>`.
    ///
    /// Safe to call concurrently for distinct agents of the same run. A
    /// second call for the same agent fails with
    /// [`AllocationError::Duplicate`].
    pub async fn allocate(&self, run: &Run, agent_id: AgentId) -> Result<AgentWorkspace, AllocationError> {
        let workspace = AgentWorkspace::for_agent(run, agent_id);
        let git_err = |source| AllocationError::Git { agent_id, source };

        let _repo_guard = self.git.lock_repository(&run.run_dir).await;

        if tokio::fs::try_exists(&workspace.worktree_path)
            .await
            .map_err(AllocationError::Directory)?
        {
            return Err(AllocationError::Duplicate {
                agent_id,
                what: "worktree path",
            });
        }
        if self
            .git
            .branch_exists(&run.run_dir, &workspace.branch_name)
            .await
            .map_err(git_err)?
        {
            return Err(AllocationError::Duplicate {
                agent_id,
                what: "branch",
            });
        }

        tokio::fs::create_dir_all(run.worktrees_dir())
            .await
            .map_err(AllocationError::Directory)?;

        // The seed commit is the only commit on main when agents are allocated.
        let base = self.git.head_commit(&run.run_dir).await.map_err(git_err)?;
        self.git
            .create_branch(&run.run_dir, &workspace.branch_name, &base)
            .await
            .map_err(git_err)?;
        self.git
            .add_worktree(&run.run_dir, &workspace.worktree_path, &workspace.branch_name)
            .await
            .map_err(git_err)?;

        info!(
            run_id = %run.run_id,
            agent_id = %agent_id,
            branch = %workspace.branch_name,
            path = %workspace.worktree_path.display(),
            "Allocated agent workspace"
        );
        Ok(workspace)
    }
}
