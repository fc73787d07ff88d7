//! Intermediate agent events reported alongside an outcome.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event observed while an agent was running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Type of event.
    pub event_type: AgentEventType,
    /// Unix timestamp (milliseconds) when the event was observed.
    pub timestamp_ms: i64,
    /// Event-specific metadata (tool_name, model, error, etc.).
    pub metadata: BTreeMap<String, String>,
}

impl AgentEvent {
    /// Create a new event stamped with the current time.
    pub fn new(event_type: AgentEventType, metadata: BTreeMap<String, String>) -> Self {
        Self {
            event_type,
            timestamp_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as i64,
            metadata,
        }
    }

    /// Create a SessionInitialized event with session and model info.
    pub fn session_initialized(session_id: Option<String>, model: Option<String>) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(sid) = session_id {
            metadata.insert("session_id".to_string(), sid);
        }
        if let Some(m) = model {
            metadata.insert("model".to_string(), m);
        }
        Self::new(AgentEventType::SessionInitialized, metadata)
    }

    /// Create a ToolRequested event.
    pub fn tool_requested(tool_name: &str) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("tool_name".to_string(), tool_name.to_string());
        Self::new(AgentEventType::ToolRequested, metadata)
    }

    /// Create a ToolCompleted event.
    pub fn tool_completed(is_error: bool) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("is_error".to_string(), is_error.to_string());
        Self::new(AgentEventType::ToolCompleted, metadata)
    }

    /// Create an OutputGenerated event carrying a text excerpt.
    pub fn output_generated(summary: Option<String>) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(s) = summary {
            metadata.insert("summary".to_string(), s);
        }
        Self::new(AgentEventType::OutputGenerated, metadata)
    }

    /// Create an ExecutionCompleted event.
    pub fn execution_completed(duration_ms: Option<u64>) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(d) = duration_ms {
            metadata.insert("duration_ms".to_string(), d.to_string());
        }
        Self::new(AgentEventType::ExecutionCompleted, metadata)
    }

    /// Create an ExecutionFailed event.
    pub fn execution_failed(error: Option<String>) -> Self {
        let mut metadata = BTreeMap::new();
        if let Some(e) = error {
            metadata.insert("error".to_string(), e);
        }
        Self::new(AgentEventType::ExecutionFailed, metadata)
    }
}

/// Type of agent event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentEventType {
    /// Model/session initialized.
    SessionInitialized,
    /// Tool call requested by the model.
    ToolRequested,
    /// Tool call finished.
    ToolCompleted,
    /// Text output generated (excerpt, not individual tokens).
    OutputGenerated,
    /// The agent's loop finished successfully.
    ExecutionCompleted,
    /// The agent's loop reported an error.
    ExecutionFailed,
}
