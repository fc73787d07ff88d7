//! Validated orchestration requests.

use crate::error::ValidationError;

/// Fewest agents a request may ask for.
pub const MIN_AGENT_COUNT: u32 = 1;

/// Most agents a request may ask for.
pub const MAX_AGENT_COUNT: u32 = 10;

/// A request that passed validation. Holding one means no state has been
/// created yet and the request may safely start a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationRequest {
    prompt: String,
    agent_count: u32,
}

impl OrchestrationRequest {
    /// Validate a raw prompt and agent count.
    ///
    /// The prompt is trimmed; the count is accepted as a signed integer so
    /// that negative values are reported rather than wrapped.
    pub fn new(prompt: &str, agent_count: i64) -> Result<Self, ValidationError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }

        if agent_count < i64::from(MIN_AGENT_COUNT) || agent_count > i64::from(MAX_AGENT_COUNT) {
            return Err(ValidationError::AgentCountOutOfRange {
                got: agent_count,
                min: MIN_AGENT_COUNT,
                max: MAX_AGENT_COUNT,
            });
        }

        Ok(Self {
            prompt: prompt.to_string(),
            agent_count: agent_count as u32,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn agent_count(&self) -> u32 {
        self.agent_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        let req = OrchestrationRequest::new("  add a README line \n", 3).unwrap();
        assert_eq!(req.prompt(), "add a README line");
        assert_eq!(req.agent_count(), 3);
    }

    #[test]
    fn test_bounds_inclusive() {
        assert!(OrchestrationRequest::new("x", 1).is_ok());
        assert!(OrchestrationRequest::new("x", 10).is_ok());
    }

    #[test]
    fn test_empty_prompt_rejected() {
        assert_eq!(
            OrchestrationRequest::new("   ", 2),
            Err(ValidationError::EmptyPrompt)
        );
        assert_eq!(
            OrchestrationRequest::new("", 2),
            Err(ValidationError::EmptyPrompt)
        );
    }

    #[test]
    fn test_agent_count_out_of_range() {
        for bad in [0, 11, -1, i64::MAX] {
            let err = OrchestrationRequest::new("x", bad).unwrap_err();
            assert!(matches!(
                err,
                ValidationError::AgentCountOutOfRange { got, .. } if got == bad
            ));
        }
    }

    #[test]
    fn test_error_message() {
        let err = OrchestrationRequest::new("x", 11).unwrap_err();
        assert_eq!(err.to_string(), "Agent count must be between 1 and 10, got 11");
    }
}
