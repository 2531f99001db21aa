//! fm-whatsapp: WhatsApp Cloud API webhook relay
//!
//! Receives webhook callbacks from the WhatsApp Cloud API, answers the
//! verification handshake and replies to inbound text messages.

pub mod bot;
pub mod cloud;
pub mod error;
pub mod reply;
pub mod types;
pub mod webhook;

pub use bot::WhatsAppBot;
pub use cloud::CloudClient;
pub use error::{Result, WhatsAppError};
pub use reply::Responder;
pub use types::{InboundMessage, parse_inbound};
pub use webhook::{WebhookServer, WebhookState, create_webhook_router};
