//! Ready-to-use implementations of the `MessageHandler` trait.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::trace;

use crate::error::SdkError;
use crate::handler::MessageHandler;
use crate::types::ClaudeMessage;

/// A handler that keeps every message it receives.
#[derive(Default)]
pub struct CollectingHandler {
    messages: Mutex<Vec<ClaudeMessage>>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the messages collected so far.
    pub fn take(&self) -> Vec<ClaudeMessage> {
        match self.messages.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl MessageHandler for CollectingHandler {
    async fn on_message(&self, message: ClaudeMessage) -> Result<(), SdkError> {
        trace!(kind = message.kind(), "Collecting message");
        self.messages
            .lock()
            .map_err(|_| SdkError::HandlerError("message buffer poisoned".to_string()))?
            .push(message);
        Ok(())
    }
}
