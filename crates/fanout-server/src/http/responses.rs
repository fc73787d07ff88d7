//! HTTP request and response types.

use serde::{Deserialize, Serialize};

use fanout_core::{ResponseStatus, RunReport};

/// Request body for the orchestrate endpoint.
#[derive(Debug, Deserialize)]
pub struct OrchestrateRequest {
    /// Task handed to every agent. Missing is treated as empty.
    #[serde(default)]
    pub prompt: String,

    /// Number of agents to run.
    #[serde(default = "default_agent_count")]
    pub agent_count: i64,
}

fn default_agent_count() -> i64 {
    1
}

/// Response body for a completed orchestration.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrchestrateResponse {
    pub status: ResponseStatus,

    #[serde(flatten)]
    pub report: RunReport,
}

impl From<RunReport> for OrchestrateResponse {
    fn from(report: RunReport) -> Self {
        Self {
            status: ResponseStatus::Completed,
            report,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
