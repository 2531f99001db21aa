//! WhatsApp Cloud API payload types
//!
//! Inbound webhook events are modelled loosely: every collection may be
//! absent or `null`, and unknown fields are ignored. Only text messages are
//! extracted; anything else is treated as "no message".

use fm_core::PayloadShape;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WhatsAppError};

/// Current webhook layout: `entry[].changes[].value.messages[]`
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub id: Option<String>,
    pub changes: Option<Vec<WebhookChange>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub field: Option<String>,
    pub value: Option<ChangeValue>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeValue {
    pub messaging_product: Option<String>,
    pub messages: Option<Vec<WebhookMessage>>,
}

/// Older layout with a top-level `messages[]`
#[derive(Debug, Default, Deserialize)]
pub struct FlatPayload {
    pub messages: Option<Vec<WebhookMessage>>,
}

/// A single message record
#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: Option<String>,
    pub id: Option<String>,
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<TextBody>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextBody {
    #[serde(default)]
    pub body: Option<String>,
}

impl WebhookMessage {
    fn to_inbound(&self) -> Option<InboundMessage> {
        let from = self.from.as_deref()?;
        let text = self.text.as_ref()?.body.as_deref()?;
        Some(InboundMessage {
            from: from.to_string(),
            text: text.to_string(),
        })
    }
}

impl WebhookPayload {
    /// First message of the first change of the first entry
    pub fn first_message(&self) -> Option<&WebhookMessage> {
        self.entry
            .as_ref()?
            .first()?
            .changes
            .as_ref()?
            .first()?
            .value
            .as_ref()?
            .messages
            .as_ref()?
            .first()
    }
}

impl FlatPayload {
    pub fn first_message(&self) -> Option<&WebhookMessage> {
        self.messages.as_ref()?.first()
    }
}

/// Sender and text pulled out of an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub text: String,
}

/// Decode a webhook body and extract the message to reply to.
///
/// Returns `Ok(None)` when the body is valid JSON (including a bare `null`)
/// but carries no text message.
pub fn parse_inbound(body: &[u8], shape: PayloadShape) -> Result<Option<InboundMessage>> {
    let message = match shape {
        PayloadShape::Nested => {
            let payload: Option<WebhookPayload> = serde_json::from_slice(body)
                .map_err(|e| WhatsAppError::InvalidPayload(e.to_string()))?;
            payload
                .as_ref()
                .and_then(WebhookPayload::first_message)
                .and_then(WebhookMessage::to_inbound)
        }
        PayloadShape::Flat => {
            let payload: Option<FlatPayload> = serde_json::from_slice(body)
                .map_err(|e| WhatsAppError::InvalidPayload(e.to_string()))?;
            payload
                .as_ref()
                .and_then(FlatPayload::first_message)
                .and_then(WebhookMessage::to_inbound)
        }
    };
    Ok(message)
}

/// Outbound text message for the send-message endpoint
#[derive(Debug, Serialize)]
pub struct OutboundTextMessage<'a> {
    pub messaging_product: &'static str,
    pub to: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: OutboundText<'a>,
}

#[derive(Debug, Serialize)]
pub struct OutboundText<'a> {
    pub body: &'a str,
}

impl<'a> OutboundTextMessage<'a> {
    pub fn new(to: &'a str, body: &'a str) -> Self {
        Self {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: OutboundText { body },
        }
    }
}

/// Response of the send-message endpoint
#[derive(Debug, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub id: String,
}
