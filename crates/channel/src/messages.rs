//! WhatsApp interactive payloads. The engine emits channel-neutral
//! messages; this module applies the channel's shape limits before
//! anything goes on the wire.

use serde::Serialize;

use comanda_core::flows::OutboundMessage;

pub const MAX_BUTTONS: usize = 3;
pub const MAX_LIST_ROWS: usize = 10;
pub const MAX_ROW_TITLE_CHARS: usize = 20;
pub const MAX_ROW_DESCRIPTION_CHARS: usize = 72;
pub const MAX_BODY_CHARS: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    Text { body: String },
    Buttons { body: String, buttons: Vec<ButtonPayload> },
    List { body: String, button_label: String, rows: Vec<RowPayload> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonPayload {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowPayload {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Renders one engine message into its wire shape, clipping anything the
/// channel would reject outright.
pub fn render(message: &OutboundMessage) -> ChannelMessage {
    match message {
        OutboundMessage::Text { body } => {
            ChannelMessage::Text { body: clip(body, MAX_BODY_CHARS) }
        }
        OutboundMessage::Buttons { body, buttons } => ChannelMessage::Buttons {
            body: clip(body, MAX_BODY_CHARS),
            buttons: buttons
                .iter()
                .take(MAX_BUTTONS)
                .map(|choice| ButtonPayload {
                    id: choice.id.clone(),
                    title: clip(&choice.title, MAX_ROW_TITLE_CHARS),
                })
                .collect(),
        },
        OutboundMessage::List { body, button_label, rows } => ChannelMessage::List {
            body: clip(body, MAX_BODY_CHARS),
            button_label: clip(button_label, MAX_ROW_TITLE_CHARS),
            rows: rows
                .iter()
                .take(MAX_LIST_ROWS)
                .map(|row| RowPayload {
                    id: row.id.clone(),
                    title: clip(&row.title, MAX_ROW_TITLE_CHARS),
                    description: row
                        .description
                        .as_ref()
                        .map(|text| clip(text, MAX_ROW_DESCRIPTION_CHARS)),
                })
                .collect(),
        },
    }
}

/// Char-count clipping; identifiers are never clipped, only display text.
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut clipped: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
