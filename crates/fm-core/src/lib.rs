//! fm-core: feedme-relay core library
//!
//! Configuration, the shared error type and the completion API client.

pub mod config;
pub mod error;
pub mod llm;

pub use config::{Config, LlmConfig, PayloadShape, RelayConfig, ReplyPolicy, ServerConfig, WhatsAppConfig};
pub use error::{Error, Result};
pub use llm::{ClaudeClient, Message, MessageContent};
