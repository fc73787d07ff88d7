//! Agent dispatch: run every allocated agent under a concurrency ceiling.
//!
//! Each agent runs in its own task. A failing, slow, or panicking agent
//! turns into a failed outcome for that agent only; siblings keep running.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use fanout_core::{AgentEvent, AgentOutcome, AgentWorkspace};

use crate::runner::{AgentRunner, RunnerError, RunnerFailure, RunnerRequest};

/// Extra time a runner gets to report its own timeout before the
/// dispatcher drops it.
const RUNNER_GRACE: Duration = Duration::from_secs(5);

/// One agent's work: its workspace and its enhanced prompt.
#[derive(Debug, Clone)]
pub struct AgentAssignment {
    pub workspace: AgentWorkspace,
    pub prompt: String,
}

/// Runs agents through an [`AgentRunner`].
pub struct Dispatcher {
    runner: Arc<dyn AgentRunner>,
    max_concurrent: usize,
    agent_timeout: Duration,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn AgentRunner>, max_concurrent: usize, agent_timeout: Duration) -> Self {
        Self {
            runner,
            max_concurrent: max_concurrent.max(1),
            agent_timeout,
        }
    }

    /// Run every assignment and return one outcome per assignment, ordered
    /// by agent id.
    ///
    /// At most `max_concurrent` agents of this call run at once. Each agent
    /// gets `agent_timeout` from the moment it starts; a runner that does
    /// not enforce it is stopped shortly after. Cancelling `cancel`
    /// stops agents still queued or running; their outcomes are failures
    /// and outcomes already produced are kept.
    pub async fn dispatch(
        &self,
        assignments: Vec<AgentAssignment>,
        cancel: &CancellationToken,
    ) -> Vec<AgentOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        info!(
            agents = assignments.len(),
            max_concurrent = self.max_concurrent,
            timeout_secs = self.agent_timeout.as_secs(),
            runner = self.runner.name(),
            "Dispatching agents"
        );

        let mut tasks = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let workspace = assignment.workspace.clone();
            let handle = tokio::spawn(run_agent(
                self.runner.clone(),
                semaphore.clone(),
                cancel.clone(),
                self.agent_timeout,
                assignment,
            ));
            tasks.push((workspace, handle));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (workspace, handle) in tasks {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(agent_id = %workspace.agent_id, error = %e, "Agent task died");
                    let reason = if e.is_panic() {
                        "internal error: agent task panicked"
                    } else {
                        "internal error: agent task aborted"
                    };
                    AgentOutcome::failure(
                        &workspace,
                        reason,
                        vec![AgentEvent::execution_failed(Some(reason.to_string()))],
                    )
                }
            };
            outcomes.push(outcome);
        }

        outcomes.sort_by_key(|o| o.agent_id);
        outcomes
    }
}

async fn run_agent(
    runner: Arc<dyn AgentRunner>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    agent_timeout: Duration,
    assignment: AgentAssignment,
) -> AgentOutcome {
    let AgentAssignment { workspace, prompt } = assignment;
    let agent_id = workspace.agent_id;

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            let err = RunnerError::Cancelled("run cancelled before agent started".to_string());
            return failed(&workspace, err.into());
        }
        permit = semaphore.acquire_owned() => permit,
    };
    let Ok(_permit) = permit else {
        let err = RunnerError::Internal("concurrency limiter closed".to_string());
        return failed(&workspace, err.into());
    };

    info!(agent_id = %agent_id, branch = %workspace.branch_name, "Agent started");
    let started = Instant::now();
    let request = RunnerRequest {
        agent_id,
        prompt,
        working_dir: workspace.worktree_path.clone(),
        timeout: agent_timeout,
    };

    // Losing either race drops the runner future, which stops the agent.
    let backstop = agent_timeout + RUNNER_GRACE;
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            Err(RunnerError::Cancelled("run cancelled before agent finished".to_string()).into())
        }
        result = tokio::time::timeout(backstop, runner.run(request)) => match result {
            Ok(result) => result,
            Err(_) => Err(RunnerError::Timeout(agent_timeout).into()),
        },
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(output) => {
            info!(agent_id = %agent_id, elapsed_ms, "Agent succeeded");
            AgentOutcome::success(&workspace, output.output, output.messages)
        }
        Err(failure) => {
            warn!(
                agent_id = %agent_id,
                elapsed_ms,
                kind = failure.error.kind(),
                error = %failure.error,
                events = failure.messages.len(),
                "Agent failed"
            );
            failed(&workspace, failure)
        }
    }
}

/// Failed outcome keeping the agent's own events, closed by the failure.
fn failed(workspace: &AgentWorkspace, failure: RunnerFailure) -> AgentOutcome {
    let RunnerFailure { error, mut messages } = failure;
    let reason = error.to_string();
    messages.push(AgentEvent::execution_failed(Some(reason.clone())));
    AgentOutcome::failure(workspace, reason, messages)
}
