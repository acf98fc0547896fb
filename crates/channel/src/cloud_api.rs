//! Outbound transport against the WhatsApp Cloud API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use comanda_core::config::ChannelConfig;
use comanda_core::domain::conversation::PhoneNumber;
use comanda_core::errors::ApplicationError;

use crate::messages::ChannelMessage;
use crate::sender::MessageSender;

const GRAPH_BASE_URL: &str = "https://graph.facebook.com/v20.0";

pub struct CloudApiSender {
    client: Client,
    base_url: String,
    access_token: SecretString,
    phone_number_id: String,
}

impl CloudApiSender {
    pub fn new(client: Client, config: &ChannelConfig) -> Self {
        Self::with_base_url(client, config, GRAPH_BASE_URL)
    }

    pub fn with_base_url(
        client: Client,
        config: &ChannelConfig,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            access_token: config.access_token.clone(),
            phone_number_id: config.phone_number_id.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/messages", self.base_url.trim_end_matches('/'), self.phone_number_id)
    }
}

#[async_trait]
impl MessageSender for CloudApiSender {
    async fn send(
        &self,
        to: &PhoneNumber,
        message: &ChannelMessage,
    ) -> Result<(), ApplicationError> {
        let body = wire_payload(to, message);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                ApplicationError::Integration(format!("whatsapp send failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(
                event_name = "message_send_rejected",
                to = %to.0,
                status = %status,
                detail = %detail,
            );
            return Err(ApplicationError::Integration(format!(
                "whatsapp send rejected with status {status}"
            )));
        }

        tracing::debug!(event_name = "message_sent", to = %to.0);
        Ok(())
    }
}

/// Builds the Cloud API request body for one already-clipped message.
fn wire_payload(to: &PhoneNumber, message: &ChannelMessage) -> Value {
    let mut payload = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": to.0,
    });

    match message {
        ChannelMessage::Text { body } => {
            payload["type"] = json!("text");
            payload["text"] = json!({ "body": body });
        }
        ChannelMessage::Buttons { body, buttons } => {
            payload["type"] = json!("interactive");
            payload["interactive"] = json!({
                "type": "button",
                "body": { "text": body },
                "action": {
                    "buttons": buttons
                        .iter()
                        .map(|button| json!({
                            "type": "reply",
                            "reply": { "id": button.id, "title": button.title },
                        }))
                        .collect::<Vec<_>>(),
                },
            });
        }
        ChannelMessage::List { body, button_label, rows } => {
            payload["type"] = json!("interactive");
            payload["interactive"] = json!({
                "type": "list",
                "body": { "text": body },
                "action": {
                    "button": button_label,
                    "sections": [{
                        "rows": rows
                            .iter()
                            .map(|row| {
                                let mut entry = json!({ "id": row.id, "title": row.title });
                                if let Some(description) = &row.description {
                                    entry["description"] = json!(description);
                                }
                                entry
                            })
                            .collect::<Vec<_>>(),
                    }],
                },
            });
        }
    }

    payload
}
