//! Reply text selection

use fm_core::{ClaudeClient, RelayConfig, ReplyPolicy};
use tracing::{error, info};

/// WhatsApp rejects text bodies longer than this
pub const MAX_TEXT_CHARS: usize = 4096;

const TRUNCATION_MARKER: &str = "...";

/// Builds the reply for an inbound message according to the configured policy
#[derive(Clone)]
pub struct Responder {
    policy: ReplyPolicy,
    welcome_text: String,
    echo_prefix: String,
    fallback_text: String,
    claude_client: Option<ClaudeClient>,
}

impl Responder {
    /// `claude_client` is only consulted under [`ReplyPolicy::Completion`]
    pub fn new(config: &RelayConfig, claude_client: Option<ClaudeClient>) -> Self {
        Self {
            policy: config.reply_policy,
            welcome_text: config.welcome_text.clone(),
            echo_prefix: config.echo_prefix.clone(),
            fallback_text: config.fallback_text.clone(),
            claude_client,
        }
    }

    pub fn policy(&self) -> ReplyPolicy {
        self.policy
    }

    /// Produce the reply body. Never fails: completion errors fall back to
    /// the configured fallback text.
    pub async fn reply_for(&self, text: &str) -> String {
        let reply = match self.policy {
            ReplyPolicy::Welcome => self.welcome_text.clone(),
            ReplyPolicy::Echo => format!("{}{}", self.echo_prefix, text),
            ReplyPolicy::Completion => self.complete(text).await,
        };
        truncate_text(&reply, MAX_TEXT_CHARS)
    }

    async fn complete(&self, text: &str) -> String {
        let Some(client) = &self.claude_client else {
            error!("Completion policy configured without an LLM client");
            return self.fallback_text.clone();
        };

        match client.complete(text).await {
            Ok(reply) => {
                info!("Completion produced {} characters", reply.chars().count());
                reply
            }
            Err(e) => {
                error!("Completion failed, using fallback reply: {}", e);
                self.fallback_text.clone()
            }
        }
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
