//! WhatsApp Cloud API client

use std::time::Duration;

use fm_core::WhatsAppConfig;
use reqwest::Client;
use tracing::{debug, error, info};

use crate::error::{Result, WhatsAppError};
use crate::types::{OutboundTextMessage, SendMessageResponse};

/// Send-message client for the WhatsApp Cloud API
#[derive(Debug, Clone)]
pub struct CloudClient {
    client: Client,
    access_token: String,
    phone_number_id: String,
    base_url: String,
    api_version: String,
}

impl CloudClient {
    /// Create a new client with the configured timeout
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            access_token: config.access_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        })
    }

    /// `{base}/{version}/{phone_number_id}/messages`
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, self.phone_number_id
        )
    }

    /// Send a text message. Returns the platform message id when present.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<Option<String>> {
        if self.access_token.is_empty() || self.phone_number_id.is_empty() {
            return Err(WhatsAppError::CredentialsNotSet);
        }

        info!("Sending WhatsApp message to {}", to);

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&OutboundTextMessage::new(to, body))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!("WhatsApp API response: {} - {}", status, text);

        if !status.is_success() {
            error!("WhatsApp API error: {} - {}", status, text);
            return Err(WhatsAppError::Api(format!("{} - {}", status, text)));
        }

        let message_id = serde_json::from_str::<SendMessageResponse>(&text)
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .map(|m| m.id);

        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> WhatsAppConfig {
        WhatsAppConfig {
            access_token: "wa-token".to_string(),
            phone_number_id: "1098765".to_string(),
            base_url: server.uri(),
            timeout_secs: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_messages_url() {
        let config = WhatsAppConfig {
            phone_number_id: "42".to_string(),
            base_url: "https://graph.example.com/".to_string(),
            api_version: "v16.0".to_string(),
            ..Default::default()
        };
        let client = CloudClient::new(&config).unwrap();
        assert_eq!(client.messages_url(), "https://graph.example.com/v16.0/42/messages");
    }

    #[tokio::test]
    async fn test_send_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v21.0/1098765/messages"))
            .and(header("authorization", "Bearer wa-token"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "15551234567",
                "type": "text",
                "text": {"body": "hello"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "contacts": [{"input": "15551234567", "wa_id": "15551234567"}],
                "messages": [{"id": "wamid.abc"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudClient::new(&config_for(&server)).unwrap();
        let id = client.send_text("15551234567", "hello").await.unwrap();
        assert_eq!(id.as_deref(), Some("wamid.abc"));
    }

    #[tokio::test]
    async fn test_send_text_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudClient::new(&config_for(&server)).unwrap();
        let err = client.send_text("1555", "hello").await.unwrap_err();
        assert!(matches!(err, WhatsAppError::Api(msg) if msg.contains("invalid token")));
    }

    #[tokio::test]
    async fn test_send_text_without_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut config = config_for(&server);
        config.access_token.clear();
        let client = CloudClient::new(&config).unwrap();
        assert!(matches!(
            client.send_text("1555", "hello").await,
            Err(WhatsAppError::CredentialsNotSet)
        ));
    }

    #[tokio::test]
    async fn test_send_text_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client = CloudClient::new(&config_for(&server)).unwrap();
        assert!(matches!(
            client.send_text("1555", "hello").await,
            Err(WhatsAppError::Http(_))
        ));
    }
}
