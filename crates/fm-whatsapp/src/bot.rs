//! WhatsApp relay bot wrapper

use std::future::Future;
use std::sync::Arc;

use fm_core::{ClaudeClient, Config, ReplyPolicy};
use tracing::{info, warn};

use crate::cloud::CloudClient;
use crate::error::{Result, WhatsAppError};
use crate::reply::Responder;
use crate::webhook::{WebhookServer, WebhookState};

/// WhatsApp relay bot: owns the clients and the server settings
pub struct WhatsAppBot {
    bind_addr: String,
    webhook_path: String,
    max_body_bytes: usize,
    state: WebhookState,
}

impl WhatsAppBot {
    /// Build the bot from configuration.
    ///
    /// Missing WhatsApp credentials or LLM key are only warned about here;
    /// the corresponding outbound calls fail when made.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = &config.server.webhook_path;
        validate_webhook_path(path)?;

        if config.whatsapp.verify_token.is_empty() {
            warn!("WHATSAPP_VERIFY_TOKEN not set; verification requests will be rejected");
        }
        if config.whatsapp.access_token.is_empty() || config.whatsapp.phone_number_id.is_empty() {
            warn!("WhatsApp access token or phone number id not set; replies will fail");
        }

        let claude_client = match config.relay.reply_policy {
            ReplyPolicy::Completion => {
                if config.llm.api_key.is_empty() {
                    warn!("LLM API key not set; completion replies will use the fallback text");
                }
                Some(ClaudeClient::new(config.llm_config())?)
            }
            ReplyPolicy::Welcome | ReplyPolicy::Echo => None,
        };

        let state = WebhookState {
            verify_token: config.whatsapp.verify_token.clone(),
            app_secret: config.whatsapp.app_secret.clone().filter(|s| !s.is_empty()),
            payload_shape: config.relay.payload_shape,
            cloud_client: Arc::new(CloudClient::new(&config.whatsapp)?),
            responder: Arc::new(Responder::new(&config.relay, claude_client)),
        };

        Ok(Self {
            bind_addr: format!("{}:{}", config.server.host, config.server.port),
            webhook_path: path.clone(),
            max_body_bytes: config.server.max_body_bytes,
            state,
        })
    }

    /// Address the server will bind to
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    /// Start the webhook server and run until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "Starting WhatsApp relay (policy={:?}, shape={:?})",
            self.state.responder.policy(),
            self.state.payload_shape
        );

        let server = WebhookServer::new(self.bind_addr, self.webhook_path, self.max_body_bytes, self.state);
        server.start(shutdown).await
    }
}

/// The webhook route must be a static path axum accepts: absolute, no
/// captures (`:x`, `*x`, `{x}`), and not shadowing `/health`.
fn validate_webhook_path(path: &str) -> Result<()> {
    let invalid = || WhatsAppError::Config(format!("Invalid webhook path: {}", path));

    if !path.starts_with('/') || path == "/health" {
        return Err(invalid());
    }
    if path.contains(['{', '}']) {
        return Err(invalid());
    }
    if path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(invalid());
    }
    Ok(())
}
