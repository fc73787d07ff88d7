//! Newtype wrappers for identifiers to ensure type safety.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use uuid::Uuid;

/// Unique identifier for a Run.
///
/// Generated ids have the form `<YYYYMMDDTHHMMSS>-<8 hex chars>`: the
/// creation time in UTC followed by a random suffix. The suffix keeps ids
/// unique across replicas creating runs in the same second; callers still
/// treat a collision on disk as possible and retry with a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Create a new RunId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new RunId stamped with the current time.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate a new RunId stamped with the given time.
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", now.format("%Y%m%dT%H%M%S"), &suffix[..8]))
    }

    /// Name of the directory holding this run under the runs root.
    pub fn dir_name(&self) -> String {
        format!("run_{}", self.0)
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// 1-based identifier of an agent within a run. Zero is unrepresentable,
/// including on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(NonZeroU32);

impl AgentId {
    /// Create an AgentId, or `None` for 0.
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// Ids for agents `1..=count`.
    pub fn range(count: u32) -> impl Iterator<Item = AgentId> {
        (1..=count).filter_map(AgentId::new)
    }

    /// Get the numeric value.
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Branch (and worktree directory) name owned by this agent.
    pub fn branch_name(self) -> String {
        format!("agent-{}", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
