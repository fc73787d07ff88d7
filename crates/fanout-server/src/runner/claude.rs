//! Agent runner backed by the Claude Code CLI.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use fanout_claude_sdk::{
    ChatMessage, ClaudeExecutor, ClaudeMessage, CollectingHandler, ContentItem, PermissionMode,
    SdkError,
};
use fanout_core::AgentEvent;

use super::{AgentRunner, RunnerError, RunnerFailure, RunnerOutput, RunnerRequest};
use crate::config::ClaudeConfig;

/// Name of the MCP server agents get their tools from in container mode.
const DOCKER_MCP_SERVER: &str = "claude-code-docker";

/// Longest text excerpt kept in an `output_generated` event.
const EXCERPT_CHARS: usize = 200;

/// Runs each agent as a one-shot `claude` process in its worktree.
pub struct ClaudeRunner {
    config: ClaudeConfig,
}

impl ClaudeRunner {
    pub fn new(config: ClaudeConfig) -> Self {
        Self { config }
    }

    fn executor(&self, working_dir: &Path) -> ClaudeExecutor {
        let mut executor = ClaudeExecutor::new(&self.config.claude_path)
            .with_permission_mode(PermissionMode::BypassPermissions);

        if let Some(model) = &self.config.model {
            executor = executor.with_model(model);
        }
        if let Some(key) = &self.config.anthropic_api_key {
            executor = executor.with_env("ANTHROPIC_API_KEY", key);
        }
        if let Some(mcp) = self.mcp_config(working_dir) {
            executor = executor
                .with_mcp_config(mcp)
                .with_allowed_tool(format!("mcp__{}__*", DOCKER_MCP_SERVER));
        }
        executor
    }

    /// MCP config running the agent's tools in a container with the worktree
    /// mounted at `/workspace`. `None` unless an image is configured.
    fn mcp_config(&self, working_dir: &Path) -> Option<String> {
        let image = self.config.docker_mcp_image.as_ref()?;
        let mount = format!("{}:/workspace", working_dir.display());
        let config = json!({
            "mcpServers": {
                DOCKER_MCP_SERVER: {
                    "type": "stdio",
                    "command": "docker",
                    "args": ["run", "-i", "--rm", "-v", mount, image, "claude", "mcp", "serve"],
                    "env": {
                        "ANTHROPIC_API_KEY": self.config.anthropic_api_key.clone().unwrap_or_default(),
                    },
                }
            }
        });
        Some(config.to_string())
    }
}

#[async_trait]
impl AgentRunner for ClaudeRunner {
    async fn run(&self, request: RunnerRequest) -> Result<RunnerOutput, RunnerFailure> {
        info!(
            agent_id = %request.agent_id,
            working_dir = %request.working_dir.display(),
            timeout_secs = request.timeout.as_secs(),
            "Starting Claude agent"
        );

        // Enforced here as well as by the dispatcher so a timed-out agent
        // keeps the events it streamed before the deadline.
        let handler = Arc::new(CollectingHandler::new());
        let executor = self.executor(&request.working_dir);
        let execution = executor.execute(&request.working_dir, &request.prompt, handler.clone());
        let result = tokio::time::timeout(request.timeout, execution).await;
        let messages = to_events(handler.take());

        let result = match result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return Err(RunnerFailure::new(classify(e), messages)),
            Err(_) => {
                warn!(agent_id = %request.agent_id, events = messages.len(), "Claude agent timed out");
                return Err(RunnerFailure::new(RunnerError::Timeout(request.timeout), messages));
            }
        };
        if result.is_error {
            let reason = if result.result.trim().is_empty() {
                result.subtype.unwrap_or_else(|| "unknown error".to_string())
            } else {
                result.result
            };
            warn!(agent_id = %request.agent_id, reason = %reason, "Claude reported an error");
            return Err(RunnerFailure::new(RunnerError::AgentError(reason), messages));
        }

        info!(
            agent_id = %request.agent_id,
            session_id = ?result.session_id,
            duration_ms = result.duration_ms,
            events = messages.len(),
            "Claude agent finished"
        );
        Ok(RunnerOutput {
            output: result.result,
            messages,
        })
    }

    fn ensure_ready(&self) -> Result<(), RunnerError> {
        if self.config.anthropic_api_key.is_none() {
            return Err(RunnerError::Unavailable(
                "ANTHROPIC_API_KEY not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "claude"
    }
}

fn classify(err: SdkError) -> RunnerError {
    match err {
        SdkError::ClaudeNotFound(path) => {
            RunnerError::Unavailable(format!("claude CLI not found at '{}'", path))
        }
        SdkError::SpawnError(e) => RunnerError::Transport(e.to_string()),
        SdkError::ProcessError { code, stderr } => RunnerError::Process { code, stderr },
        SdkError::MissingResult { unparsed_lines } => RunnerError::MalformedOutput(format!(
            "no result message ({} unparseable lines)",
            unparsed_lines
        )),
        SdkError::JsonError(e) => RunnerError::MalformedOutput(e.to_string()),
        SdkError::HandlerError(e) => RunnerError::Internal(e),
    }
}

/// Reduce the raw stream to the events reported with the outcome.
fn to_events(messages: Vec<ClaudeMessage>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    for message in messages {
        match message {
            ClaudeMessage::System {
                session_id, model, ..
            } => events.push(AgentEvent::session_initialized(session_id, model)),
            ClaudeMessage::Assistant { message, .. } => assistant_events(message, &mut events),
            ClaudeMessage::User { message, .. } => tool_results(message, &mut events),
            ClaudeMessage::Result {
                subtype,
                is_error,
                duration_ms,
                result,
                ..
            } => {
                let failed = is_error.unwrap_or(false)
                    || subtype.as_deref().is_some_and(|s| s != "success");
                if failed {
                    events.push(AgentEvent::execution_failed(result.or(subtype)));
                } else {
                    events.push(AgentEvent::execution_completed(duration_ms));
                }
            }
            ClaudeMessage::Unknown(_) => debug!("Dropping unknown Claude message"),
        }
    }
    events
}

/// Text excerpts and tool calls from an assistant turn.
fn assistant_events(message: ChatMessage, events: &mut Vec<AgentEvent>) {
    for item in message.content {
        match item {
            ContentItem::Text { text } if !text.trim().is_empty() => {
                let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
                events.push(AgentEvent::output_generated(Some(excerpt)));
            }
            ContentItem::ToolUse { name, .. } => events.push(AgentEvent::tool_requested(&name)),
            _ => {}
        }
    }
}

/// Tool results echoed back in a user turn.
fn tool_results(message: ChatMessage, events: &mut Vec<AgentEvent>) {
    for item in message.content {
        if let ContentItem::ToolResult { is_error, .. } = item {
            events.push(AgentEvent::tool_completed(is_error.unwrap_or(false)));
        }
    }
}
