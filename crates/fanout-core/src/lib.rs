//! Fanout Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Git or the filesystem
//! - Runtime specifics
//!
//! It also hosts the two pure stages of an orchestration: prompt
//! enhancement and result aggregation.

pub mod error;
pub mod event;
pub mod ids;
pub mod outcome;
pub mod prompt;
pub mod report;
pub mod request;
pub mod run;
pub mod status;

// Re-export commonly used types
pub use error::{AggregationInvariantError, ValidationError};
pub use event::{AgentEvent, AgentEventType};
pub use ids::{AgentId, RunId};
pub use outcome::AgentOutcome;
pub use prompt::enhance;
pub use report::{aggregate, RunReport, RunSummary};
pub use request::{OrchestrationRequest, MAX_AGENT_COUNT, MIN_AGENT_COUNT};
pub use run::{AgentWorkspace, Run, RunInfo, WorkspaceRef};
pub use status::{AgentStatus, ResponseStatus};
