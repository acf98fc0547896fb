//! WhatsApp Cloud webhook payloads. One POST may batch several entries;
//! each inbound customer message becomes its own [`InboundEvent`].

use serde::Deserialize;

use comanda_core::domain::conversation::PhoneNumber;

use crate::events::{InboundEvent, InboundKind};

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    /// Absent on status-only notifications (delivered, read).
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub interactive: Option<InteractiveContent>,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct InteractiveContent {
    #[serde(rename = "type")]
    pub interactive_type: String,
    #[serde(default)]
    pub button_reply: Option<ReplyContent>,
    #[serde(default)]
    pub list_reply: Option<ReplyContent>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyContent {
    pub id: String,
    pub title: String,
}

/// Flattens a webhook payload into inbound events. Anything that is not
/// text or an interactive reply comes back as `Unsupported` so the
/// service can acknowledge without answering.
pub fn parse_events(payload: &WebhookPayload) -> Vec<InboundEvent> {
    payload
        .entry
        .iter()
        .flat_map(|entry| &entry.changes)
        .flat_map(|change| &change.value.messages)
        .map(|message| InboundEvent {
            from: PhoneNumber(message.from.clone()),
            kind: classify(message),
        })
        .collect()
}

fn classify(message: &InboundMessage) -> InboundKind {
    match message.message_type.as_str() {
        "text" => match &message.text {
            Some(content) => InboundKind::Text { text: content.body.clone() },
            None => InboundKind::Unsupported { event_type: "text".to_owned() },
        },
        "interactive" => match &message.interactive {
            Some(content) => classify_interactive(content),
            None => InboundKind::Unsupported { event_type: "interactive".to_owned() },
        },
        other => InboundKind::Unsupported { event_type: other.to_owned() },
    }
}

fn classify_interactive(content: &InteractiveContent) -> InboundKind {
    if let Some(reply) = &content.button_reply {
        return InboundKind::ButtonReply { id: reply.id.clone(), title: reply.title.clone() };
    }
    if let Some(reply) = &content.list_reply {
        return InboundKind::ListReply { id: reply.id.clone(), title: reply.title.clone() };
    }
    InboundKind::Unsupported { event_type: format!("interactive.{}", content.interactive_type) }
}
