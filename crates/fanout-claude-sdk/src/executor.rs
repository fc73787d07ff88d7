//! Claude Code executor for running agents via subprocess.
//!
//! This module provides the main `ClaudeExecutor` type for executing
//! Claude Code agents using one-shot mode with streaming JSON output.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::SdkError;
use crate::handler::MessageHandler;
use crate::types::{ClaudeMessage, PermissionMode};

/// Number of stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Result of a Claude Code execution, taken from its terminal `result` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The session ID from Claude Code.
    pub session_id: Option<String>,

    /// The model reported at session start.
    pub model: Option<String>,

    /// Duration of execution in milliseconds.
    pub duration_ms: u64,

    /// Number of agent turns, if reported.
    pub num_turns: Option<u32>,

    /// Whether Claude reported the run as an error.
    pub is_error: bool,

    /// Result subtype (`success`, `error_max_turns`, ...).
    pub subtype: Option<String>,

    /// Final text of the run.
    pub result: String,
}

/// Executor for Claude Code agents.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use fanout_claude_sdk::{ClaudeExecutor, CollectingHandler, PermissionMode};
///
/// async fn run() -> Result<(), Box<dyn std::error::Error>> {
///     let executor = ClaudeExecutor::new("claude")
///         .with_permission_mode(PermissionMode::BypassPermissions);
///
///     let handler = Arc::new(CollectingHandler::new());
///     let result = executor
///         .execute(Path::new("."), "What is 2 + 2?", handler.clone())
///         .await?;
///
///     println!("{} ({} messages)", result.result, handler.take().len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ClaudeExecutor {
    /// Path to the Claude CLI executable.
    claude_path: String,

    /// Permission mode to use.
    permission_mode: PermissionMode,

    /// Model to use (optional).
    model: Option<String>,

    /// Tools the agent may use without asking. Empty means CLI default.
    allowed_tools: Vec<String>,

    /// MCP server configuration as a JSON string (optional).
    mcp_config: Option<String>,

    /// Additional environment variables.
    env_vars: Vec<(String, String)>,
}

impl ClaudeExecutor {
    /// Create a new executor with the given path to the Claude CLI.
    ///
    /// The path can be just "claude" to use PATH lookup, or a full path.
    pub fn new(claude_path: impl Into<String>) -> Self {
        Self {
            claude_path: claude_path.into(),
            permission_mode: PermissionMode::Default,
            model: None,
            allowed_tools: Vec::new(),
            mcp_config: None,
            env_vars: Vec::new(),
        }
    }

    /// Set the permission mode.
    pub fn with_permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = mode;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Allow a tool (or a `mcp__server__*` pattern).
    pub fn with_allowed_tool(mut self, tool: impl Into<String>) -> Self {
        self.allowed_tools.push(tool.into());
        self
    }

    /// Attach MCP servers, as the JSON accepted by `--mcp-config`.
    pub fn with_mcp_config(mut self, config: impl Into<String>) -> Self {
        self.mcp_config = Some(config.into());
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Build the command line for a prompt.
    fn command(&self, working_dir: &Path, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.claude_path);

        // One-shot execution; stream-json in print mode requires --verbose.
        cmd.arg("--output-format=stream-json").arg("--verbose");

        if self.permission_mode != PermissionMode::Default {
            cmd.arg("--permission-mode")
                .arg(self.permission_mode.to_string());
        }

        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }

        if !self.allowed_tools.is_empty() {
            cmd.arg("--allowedTools").arg(self.allowed_tools.join(","));
        }

        if let Some(mcp) = &self.mcp_config {
            cmd.arg("--mcp-config").arg(mcp);
        }

        // The prompt itself
        cmd.arg("--print").arg(prompt);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .current_dir(working_dir)
            .kill_on_drop(true);

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        cmd
    }

    /// Loggable form of the command line. Environment values, the MCP
    /// config and the prompt are left out since they can carry credentials.
    fn describe(&self, working_dir: &Path, prompt: &str) -> String {
        let mut parts = vec![self.claude_path.clone(), "--output-format=stream-json".to_string()];
        if self.permission_mode != PermissionMode::Default {
            parts.push(format!("--permission-mode {}", self.permission_mode));
        }
        if let Some(model) = &self.model {
            parts.push(format!("--model {}", model));
        }
        if !self.allowed_tools.is_empty() {
            parts.push(format!("--allowedTools {}", self.allowed_tools.join(",")));
        }
        if self.mcp_config.is_some() {
            parts.push("--mcp-config <redacted>".to_string());
        }
        parts.push(format!("--print <{} bytes>", prompt.len()));

        let env_keys: Vec<&str> = self.env_vars.iter().map(|(k, _)| k.as_str()).collect();
        format!(
            "{} (cwd: {}, env: [{}])",
            parts.join(" "),
            working_dir.display(),
            env_keys.join(", ")
        )
    }

    /// Execute a prompt with Claude Code.
    ///
    /// Spawns a new Claude process in `working_dir` and forwards every
    /// message it prints to `handler`. Dropping the returned future kills
    /// the process.
    pub async fn execute(
        &self,
        working_dir: &Path,
        prompt: &str,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<ExecutionResult, SdkError> {
        info!(
            claude_path = %self.claude_path,
            working_dir = %working_dir.display(),
            prompt_len = prompt.len(),
            "Preparing Claude execution"
        );

        let mut cmd = self.command(working_dir, prompt);
        debug!(command = %self.describe(working_dir, prompt), "Spawning Claude");

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| {
            error!(error = %e, "Failed to spawn Claude process");
            if e.kind() == ErrorKind::NotFound {
                SdkError::ClaudeNotFound(self.claude_path.clone())
            } else {
                SdkError::SpawnError(e)
            }
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SdkError::HandlerError("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SdkError::HandlerError("Failed to get stderr".to_string()))?;

        // Keep the tail of stderr for error reports
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        warn!(stderr = %trimmed, "Claude stderr");
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(trimmed.to_string());
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "Error reading Claude stderr");
                        break;
                    }
                }
            }
            Vec::from(tail).join("\n")
        });

        let mut reader = BufReader::new(stdout).lines();
        let mut message_count = 0u64;
        let mut unparsed_lines = 0u64;
        let mut model: Option<String> = None;
        let mut session_id: Option<String> = None;
        let mut result: Option<ExecutionResult> = None;

        while let Some(line) = reader.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let message = match serde_json::from_str::<ClaudeMessage>(trimmed) {
                Ok(message) => message,
                Err(e) => {
                    unparsed_lines += 1;
                    let preview: String = trimmed.chars().take(200).collect();
                    warn!(error = %e, preview = %preview, "Failed to parse Claude message");
                    continue;
                }
            };

            message_count += 1;
            debug!(message_num = message_count, kind = message.kind(), "Received message from Claude");

            if session_id.is_none() {
                session_id = message.session_id().map(str::to_string);
            }

            match &message {
                ClaudeMessage::System { model: m, .. } if model.is_none() => {
                    model = m.clone();
                }
                ClaudeMessage::Result {
                    subtype,
                    is_error,
                    duration_ms,
                    num_turns,
                    result: text,
                    ..
                } => {
                    let is_error = is_error.unwrap_or(false)
                        || subtype.as_deref().is_some_and(|s| s != "success");
                    result = Some(ExecutionResult {
                        session_id: session_id.clone(),
                        model: model.clone(),
                        duration_ms: duration_ms
                            .unwrap_or_else(|| started.elapsed().as_millis() as u64),
                        num_turns: *num_turns,
                        is_error,
                        subtype: subtype.clone(),
                        result: text.clone().unwrap_or_default(),
                    });
                }
                _ => {}
            }

            if let Err(e) = handler.on_message(message).await {
                warn!(error = %e, "Handler error processing message");
            }
        }

        let status = child.wait().await?;
        let stderr_tail = stderr_task.await.unwrap_or_default();
        let code = status.code().unwrap_or(-1);
        info!(
            exit_code = code,
            total_messages = message_count,
            "Claude process exited"
        );

        if !status.success() {
            return Err(SdkError::ProcessError {
                code,
                stderr: stderr_tail,
            });
        }

        result.ok_or(SdkError::MissingResult { unparsed_lines })
    }
}

impl Default for ClaudeExecutor {
    fn default() -> Self {
        Self::new("claude")
    }
}
