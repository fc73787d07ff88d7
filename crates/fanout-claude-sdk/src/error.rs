//! Error types for the Claude Code SDK.

use thiserror::Error;

/// Errors that can occur during Claude Code SDK operations.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Claude CLI executable not found.
    #[error("Claude CLI not found at '{0}'. Ensure Claude Code is installed.")]
    ClaudeNotFound(String),

    /// Failed to spawn or talk to the Claude process.
    #[error("Failed to spawn Claude process: {0}")]
    SpawnError(#[from] std::io::Error),

    /// Claude process exited with a non-zero status.
    #[error("Claude exited with code {code}: {stderr}")]
    ProcessError { code: i32, stderr: String },

    /// The process exited cleanly but never emitted a result message.
    #[error("Claude produced no result message ({unparsed_lines} unparseable lines)")]
    MissingResult { unparsed_lines: u64 },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Handler refused a message.
    #[error("Handler error: {0}")]
    HandlerError(String),
}
