//! Webhook server for the WhatsApp Cloud API
//!
//! One route handles both callbacks:
//! - `GET`: subscription verification handshake
//! - `POST`: message events, answered with a single reply

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use fm_core::PayloadShape;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::cloud::CloudClient;
use crate::error::{Result, WhatsAppError};
use crate::reply::Responder;
use crate::types::parse_inbound;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub verify_token: String,
    pub app_secret: Option<String>,
    pub payload_shape: PayloadShape,
    pub cloud_client: Arc<CloudClient>,
    pub responder: Arc<Responder>,
}

/// Query parameters of the verification handshake
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Create webhook router
pub fn create_webhook_router(state: WebhookState, webhook_path: &str, max_body_bytes: usize) -> Router {
    Router::new()
        .route(webhook_path, get(verify_webhook).post(handle_webhook))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Returns the challenge when the handshake is accepted.
///
/// An empty configured token never matches.
pub fn verify_challenge(params: &VerifyParams, verify_token: &str) -> Option<String> {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = !verify_token.is_empty() && params.verify_token.as_deref() == Some(verify_token);

    if mode_ok && token_ok {
        Some(params.challenge.clone().unwrap_or_default())
    } else {
        None
    }
}

/// Handle the verification handshake
async fn verify_webhook(
    State(state): State<Arc<WebhookState>>,
    params: std::result::Result<Query<VerifyParams>, QueryRejection>,
) -> (StatusCode, String) {
    let params = params.map(|Query(p)| p).unwrap_or_default();

    match verify_challenge(&params, &state.verify_token) {
        Some(challenge) => {
            info!("Webhook verified successfully");
            (StatusCode::OK, challenge)
        }
        None => {
            warn!("Webhook verification failed: invalid mode or token");
            (StatusCode::FORBIDDEN, "Forbidden".to_string())
        }
    }
}

/// Handle an incoming event delivery
async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = &state.app_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if let Err(e) = check_signature(secret, &body, signature) {
            warn!("Rejected webhook delivery: {}", e);
            return (StatusCode::FORBIDDEN, "Forbidden");
        }
    }

    let message = match parse_inbound(&body, state.payload_shape) {
        Ok(Some(message)) => message,
        Ok(None) => {
            debug!("Webhook delivery without a text message, nothing to do");
            return (StatusCode::OK, "");
        }
        Err(e) => {
            warn!("Failed to parse webhook body: {}", e);
            return (StatusCode::BAD_REQUEST, "Bad Request");
        }
    };

    info!("Received message from {}: {}", message.from, message.text);

    let reply = state.responder.reply_for(&message.text).await;

    // Send failures stay local; a non-2xx here would make the platform redeliver.
    match state.cloud_client.send_text(&message.from, &reply).await {
        Ok(id) => info!("Reply sent to {} ({:?})", message.from, id),
        Err(e) => error!("Failed to send reply to {}: {}", message.from, e),
    }

    (StatusCode::OK, "")
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Verify an `X-Hub-Signature-256: sha256=<hex>` header against the raw body
fn check_signature(app_secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let hex_digest = header
        .and_then(|h| h.strip_prefix("sha256="))
        .ok_or(WhatsAppError::SignatureVerificationFailed)?;
    let expected = hex::decode(hex_digest).map_err(|_| WhatsAppError::SignatureVerificationFailed)?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| WhatsAppError::SignatureVerificationFailed)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| WhatsAppError::SignatureVerificationFailed)
}

/// Webhook server
pub struct WebhookServer {
    bind_addr: String,
    webhook_path: String,
    max_body_bytes: usize,
    state: WebhookState,
}

impl WebhookServer {
    /// Create a new webhook server
    pub fn new(bind_addr: String, webhook_path: String, max_body_bytes: usize, state: WebhookState) -> Self {
        Self {
            bind_addr,
            webhook_path,
            max_body_bytes,
            state,
        }
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn start<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = create_webhook_router(self.state, &self.webhook_path, self.max_body_bytes);

        let listener = tokio::net::TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| WhatsAppError::Server(format!("Failed to bind {}: {}", self.bind_addr, e)))?;

        info!(
            "WhatsApp webhook server listening on {} (path {})",
            self.bind_addr, self.webhook_path
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| WhatsAppError::Server(e.to_string()))?;

        Ok(())
    }
}
