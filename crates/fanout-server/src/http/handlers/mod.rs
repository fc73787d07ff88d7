//! HTTP request handlers.

mod orchestrate;

pub use orchestrate::orchestrate;
