//! Completion (LLM) API client and types

mod client;
mod types;

pub use client::ClaudeClient;
pub use types::*;
