//! Core domain errors.

use thiserror::Error;

/// An orchestration request that must be rejected before any state exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Prompt missing or blank after trimming.
    #[error("Prompt is required")]
    EmptyPrompt,

    /// Agent count outside the accepted range.
    #[error("Agent count must be between {min} and {max}, got {got}")]
    AgentCountOutOfRange { got: i64, min: u32, max: u32 },
}

/// The dispatcher handed the aggregator something other than exactly one
/// outcome per requested agent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationInvariantError {
    /// Wrong number of outcomes.
    #[error("Expected {expected} agent outcomes, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Two outcomes share an agent id.
    #[error("Duplicate outcome for agent {0}")]
    DuplicateAgent(u32),

    /// An outcome carries an id outside 1..=requested.
    #[error("Outcome for agent {agent_id} is outside the requested range 1..={requested}")]
    UnknownAgent { agent_id: u32, requested: usize },
}
