//! Message handler trait for streamed Claude output.

use async_trait::async_trait;

use crate::error::SdkError;
use crate::types::ClaudeMessage;

/// Receives every message Claude writes to stdout, in order.
///
/// Implement this trait to stream output or track progress. An error from
/// the handler is logged and does not stop the execution.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Called when a message is received from Claude.
    async fn on_message(&self, message: ClaudeMessage) -> Result<(), SdkError>;
}
