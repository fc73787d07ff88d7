//! Result aggregation into a run report.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AggregationInvariantError;
use crate::{AgentOutcome, Run, RunInfo};

/// Outcome counts for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_agents: usize,
    pub successful: usize,
    pub failed: usize,
}

/// The assembled result of a run: run details, counts, and one outcome per
/// agent ordered by agent id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_info: RunInfo,
    pub summary: RunSummary,
    pub results: Vec<AgentOutcome>,
}

/// Assemble a report from the dispatcher's outcomes.
///
/// Exactly one outcome per agent `1..=requested` is required. Anything else
/// means the dispatcher lost or duplicated an agent and the report would
/// misstate the run, so it is refused.
pub fn aggregate(
    run: &Run,
    requested: usize,
    mut outcomes: Vec<AgentOutcome>,
) -> Result<RunReport, AggregationInvariantError> {
    if outcomes.len() != requested {
        return Err(AggregationInvariantError::CountMismatch {
            expected: requested,
            actual: outcomes.len(),
        });
    }

    let mut seen = HashSet::with_capacity(requested);
    for outcome in &outcomes {
        let id = outcome.agent_id.get();
        if id as usize > requested {
            return Err(AggregationInvariantError::UnknownAgent {
                agent_id: id,
                requested,
            });
        }
        if !seen.insert(id) {
            return Err(AggregationInvariantError::DuplicateAgent(id));
        }
    }

    outcomes.sort_by_key(|o| o.agent_id);

    let successful = outcomes.iter().filter(|o| o.is_success()).count();
    let summary = RunSummary {
        total_agents: requested,
        successful,
        failed: requested - successful,
    };

    Ok(RunReport {
        run_info: run.info(),
        summary,
        results: outcomes,
    })
}
