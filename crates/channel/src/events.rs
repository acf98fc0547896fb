//! Inbound webhook events, normalized into engine turn inputs.

use comanda_core::domain::conversation::PhoneNumber;
use comanda_core::flows::TurnInput;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub from: PhoneNumber,
    pub kind: InboundKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundKind {
    Text { text: String },
    ButtonReply { id: String, title: String },
    ListReply { id: String, title: String },
    /// Media, reactions, statuses. Acknowledged and ignored.
    Unsupported { event_type: String },
}

impl InboundEvent {
    pub fn turn_input(&self) -> Option<TurnInput> {
        match &self.kind {
            InboundKind::Text { text } => Some(TurnInput::Text(text.clone())),
            InboundKind::ButtonReply { id, title } => {
                Some(TurnInput::ButtonReply { id: id.clone(), title: title.clone() })
            }
            InboundKind::ListReply { id, title } => {
                Some(TurnInput::ListReply { id: id.clone(), title: title.clone() })
            }
            InboundKind::Unsupported { .. } => None,
        }
    }
}
