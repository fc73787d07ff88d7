//! Orchestration of one request, from run creation to report.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::try_join_all;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use fanout_core::{
    aggregate, enhance, AgentId, AggregationInvariantError, OrchestrationRequest, RunReport,
};

use crate::config::Config;
use crate::dispatcher::{AgentAssignment, Dispatcher};
use crate::git::GitCli;
use crate::run_manager::{RunCreationError, RunManager};
use crate::runner::{AgentRunner, RunnerError};
use crate::worktree::{AllocationError, WorktreeAllocator};

/// Request-level failures. Per-agent failures never show up here.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    #[error("Agent runner is not ready: {0}")]
    RunnerUnavailable(#[source] RunnerError),

    #[error("Failed to create run: {0}")]
    RunCreation(#[from] RunCreationError),

    #[error("Failed to allocate agent workspaces: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Internal error assembling results: {0}")]
    Aggregation(#[from] AggregationInvariantError),
}

/// Ties run creation, allocation, dispatch and aggregation together.
pub struct Orchestrator {
    run_manager: RunManager,
    allocator: WorktreeAllocator,
    dispatcher: Dispatcher,
    runner: Arc<dyn AgentRunner>,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, runner: Arc<dyn AgentRunner>) -> Self {
        let git = Arc::new(GitCli::new(&config.git_path));
        Self {
            run_manager: RunManager::new(config.runs_root(), git.clone()),
            allocator: WorktreeAllocator::new(git),
            dispatcher: Dispatcher::new(
                runner.clone(),
                config.max_concurrent_agents,
                config.agent_timeout,
            ),
            runner,
        }
    }

    /// Run one validated request to completion.
    ///
    /// Every workspace is allocated before any agent starts. Once dispatch
    /// begins the request always yields a report, even when `cancel` fires.
    pub async fn orchestrate(
        &self,
        request: &OrchestrationRequest,
        cancel: CancellationToken,
    ) -> Result<RunReport, OrchestrateError> {
        let started = Instant::now();
        self.runner
            .ensure_ready()
            .map_err(OrchestrateError::RunnerUnavailable)?;

        let run = self.run_manager.create_run().await?;
        info!(
            run_id = %run.run_id,
            agent_count = request.agent_count(),
            "Starting orchestration"
        );

        let workspaces = try_join_all(
            AgentId::range(request.agent_count()).map(|id| self.allocator.allocate(&run, id)),
        )
        .await
        .map_err(|e| {
            error!(run_id = %run.run_id, error = %e, "Workspace allocation failed");
            e
        })?;

        let assignments = workspaces
            .into_iter()
            .map(|workspace| AgentAssignment {
                prompt: enhance(
                    request.prompt(),
                    workspace.agent_id,
                    &workspace.branch_name,
                    &workspace.worktree_path,
                ),
                workspace,
            })
            .collect();

        let outcomes = self.dispatcher.dispatch(assignments, &cancel).await;

        let report = aggregate(&run, request.agent_count() as usize, outcomes).map_err(|e| {
            error!(run_id = %run.run_id, error = %e, "Aggregation invariant violated");
            e
        })?;

        info!(
            run_id = %run.run_id,
            total = report.summary.total_agents,
            successful = report.summary.successful,
            failed = report.summary.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Orchestration completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::{Script, ScriptedRunner};
    use fanout_core::AgentStatus;
    use std::collections::HashSet;
    use std::time::Duration;

    fn config(root: &std::path::Path) -> Arc<Config> {
        Arc::new(Config {
            workspace_root: root.to_path_buf(),
            agent_timeout: Duration::from_secs(30),
            ..Config::default()
        })
    }

    fn request(prompt: &str, count: i64) -> OrchestrationRequest {
        OrchestrationRequest::new(prompt, count).unwrap()
    }

    #[tokio::test]
    async fn test_three_agents_succeed() {
        let store = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let orchestrator = Orchestrator::new(config(store.path()), runner.clone());

        let report = orchestrator
            .orchestrate(&request("add a README section", 3), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.summary.total_agents, 3);
        assert_eq!(report.summary.successful, 3);
        assert_eq!(report.summary.failed, 0);
        assert!(report.run_info.git_initialized);

        let ids: Vec<u32> = report.results.iter().map(|o| o.agent_id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let branches: HashSet<_> = report.results.iter().map(|o| &o.workspace.branch_name).collect();
        let paths: HashSet<_> = report.results.iter().map(|o| &o.workspace.worktree_path).collect();
        assert_eq!(branches.len(), 3);
        assert_eq!(paths.len(), 3);
        for outcome in &report.results {
            assert!(outcome.workspace.worktree_path.starts_with(&report.run_info.run_dir));
            assert!(std::path::Path::new(&outcome.workspace.worktree_path).is_dir());
        }

        // Each agent sees its own branch and the raw prompt last.
        for req in runner.requests() {
            let branch = req.agent_id.branch_name();
            assert!(req.prompt.contains(&format!("`{}`", branch)));
            assert!(req.prompt.trim_end().ends_with("add a README section"));
            assert!(req.working_dir.ends_with(&branch));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_timeout_does_not_fail_request() {
        let store = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().script(2, Script::Hang));
        let orchestrator = Orchestrator::new(config(store.path()), runner);

        let report = orchestrator
            .orchestrate(&request("task", 3), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.results[1].status, AgentStatus::Failed);
        assert!(report.results[1].error.as_deref().unwrap().starts_with("timeout"));
        assert!(report.results[0].error.is_none());
        assert!(report.results[2].error.is_none());
    }

    #[tokio::test]
    async fn test_all_fail_still_reports() {
        let store = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .script(1, Script::Fail("boom".into()))
                .script(2, Script::Fail("boom".into())),
        );
        let orchestrator = Orchestrator::new(config(store.path()), runner);

        let report = orchestrator
            .orchestrate(&request("task", 2), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.summary.successful, 0);
        assert_eq!(report.summary.failed, 2);
    }

    #[tokio::test]
    async fn test_runner_not_ready_creates_nothing() {
        let store = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().not_ready());
        let orchestrator = Orchestrator::new(config(store.path()), runner);

        let err = orchestrator
            .orchestrate(&request("task", 1), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestrateError::RunnerUnavailable(_)));
        assert!(!store.path().join("runs").exists());
    }

    #[tokio::test]
    async fn test_run_creation_failure() {
        let store = tempfile::tempdir().unwrap();
        std::fs::write(store.path().join("runs"), "blocked").unwrap();
        let orchestrator = Orchestrator::new(config(store.path()), Arc::new(ScriptedRunner::new()));

        let err = orchestrator
            .orchestrate(&request("task", 2), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestrateError::RunCreation(_)));
    }

    #[tokio::test]
    async fn test_runs_are_isolated() {
        let store = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(config(store.path()), Arc::new(ScriptedRunner::new()));

        let (first, second) = (request("first", 2), request("second", 2));
        let (a, b) = tokio::join!(
            orchestrator.orchestrate(&first, CancellationToken::new()),
            orchestrator.orchestrate(&second, CancellationToken::new()),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.run_info.run_id, b.run_info.run_id);
        assert_ne!(a.run_info.run_dir, b.run_info.run_dir);
    }
}
