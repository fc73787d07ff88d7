//! Scripted runner for exercising the dispatcher and orchestrator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use fanout_core::{AgentEvent, AgentId};

use super::{AgentRunner, RunnerError, RunnerFailure, RunnerOutput, RunnerRequest};

/// What a scripted agent does when run.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Succeed with this output after an optional delay.
    Succeed { output: String, delay: Duration },
    /// Report a session and a tool call, then fail with a process error.
    Fail(String),
    /// Never finish.
    Hang,
    /// Panic inside the agent task.
    Panic,
}

/// Runner whose agents follow a script keyed by agent id. Agents without a
/// script succeed with `"agent <n> done"`.
pub(crate) struct ScriptedRunner {
    scripts: HashMap<AgentId, Script>,
    ready: bool,
    running: AtomicUsize,
    peak: AtomicUsize,
    seen: Mutex<Vec<RunnerRequest>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            ready: true,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn script(mut self, agent: u32, script: Script) -> Self {
        self.scripts.insert(AgentId::new(agent).unwrap(), script);
        self
    }

    pub(crate) fn delay_all(mut self, agents: u32, delay: Duration) -> Self {
        for id in AgentId::range(agents) {
            self.scripts.insert(
                id,
                Script::Succeed {
                    output: format!("agent {} done", id),
                    delay,
                },
            );
        }
        self
    }

    pub(crate) fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Most agents observed running at once.
    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Agents running right now.
    pub(crate) fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub(crate) fn requests(&self) -> Vec<RunnerRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Decrements the running gauge even when the agent future is dropped.
struct Running<'a>(&'a AtomicUsize);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn run(&self, request: RunnerRequest) -> Result<RunnerOutput, RunnerFailure> {
        self.seen.lock().unwrap().push(request.clone());
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _running = Running(&self.running);

        let script = self.scripts.get(&request.agent_id).cloned().unwrap_or(Script::Succeed {
            output: format!("agent {} done", request.agent_id),
            delay: Duration::ZERO,
        });

        match script {
            Script::Succeed { output, delay } => {
                tokio::time::sleep(delay).await;
                Ok(RunnerOutput {
                    output: output.clone(),
                    messages: vec![
                        AgentEvent::output_generated(Some(output)),
                        AgentEvent::execution_completed(Some(delay.as_millis() as u64)),
                    ],
                })
            }
            Script::Fail(stderr) => Err(RunnerFailure::new(
                RunnerError::Process { code: 1, stderr },
                vec![
                    AgentEvent::session_initialized(Some("scripted".to_string()), None),
                    AgentEvent::tool_requested("Bash"),
                ],
            )),
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Script::Panic => panic!("scripted agent {} panicked", request.agent_id),
        }
    }

    fn ensure_ready(&self) -> Result<(), RunnerError> {
        if self.ready {
            Ok(())
        } else {
            Err(RunnerError::Unavailable("scripted runner offline".to_string()))
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
