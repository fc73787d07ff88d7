//! Shared application state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::runner::AgentRunner;

/// Shared application state.
pub struct AppState {
    /// Runs requests end to end.
    pub orchestrator: Orchestrator,

    /// Cancelled on server shutdown. Every in-flight run holds a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(config: Arc<Config>, runner: Arc<dyn AgentRunner>) -> Arc<Self> {
        Self::with_shutdown(config, runner, CancellationToken::new())
    }

    /// Create a new AppState whose runs stop when `shutdown` is cancelled.
    pub fn with_shutdown(
        config: Arc<Config>,
        runner: Arc<dyn AgentRunner>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            orchestrator: Orchestrator::new(config, runner),
            shutdown,
        })
    }
}
