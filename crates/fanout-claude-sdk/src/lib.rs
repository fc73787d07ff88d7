//! Claude Code SDK for Fanout
//!
//! This crate runs Claude Code agents as one-shot subprocesses
//! (`--print` with `stream-json` output) and hands every streamed
//! message to a [`MessageHandler`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use fanout_claude_sdk::{ClaudeExecutor, CollectingHandler, PermissionMode};
//!
//! async fn run_agent() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = ClaudeExecutor::new("claude")
//!         .with_permission_mode(PermissionMode::BypassPermissions);
//!
//!     let result = executor
//!         .execute(Path::new("."), "What is 2 + 2?", Arc::new(CollectingHandler::new()))
//!         .await?;
//!
//!     println!("Session ID: {:?}", result.session_id);
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod executor;
mod handler;
mod types;

// Re-export main types
pub use client::CollectingHandler;
pub use error::SdkError;
pub use executor::{ClaudeExecutor, ExecutionResult};
pub use handler::MessageHandler;
pub use types::{ChatMessage, ClaudeMessage, ContentItem, PermissionMode};
