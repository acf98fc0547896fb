use serde::{Deserialize, Serialize};

use crate::domain::conversation::Conversation;
use crate::domain::order::OrderDraft;

/// Where a conversation currently sits. Persisted inside the
/// conversation document, so renames here are document migrations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Welcome,
    DeliveryType,
    NewAddress,
    AddressConfirmation,
    Categories,
    Products,
    ProductQuestions,
    ProductQuantity,
    OrderSummary,
    PaymentSelection,
    /// A state name written by a retired version of the bot. Documents
    /// carrying it fail the turn loudly instead of guessing.
    #[serde(other)]
    Legacy,
}

impl FlowState {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::DeliveryType => "delivery_type",
            Self::NewAddress => "new_address",
            Self::AddressConfirmation => "address_confirmation",
            Self::Categories => "categories",
            Self::Products => "products",
            Self::ProductQuestions => "product_questions",
            Self::ProductQuantity => "product_quantity",
            Self::OrderSummary => "order_summary",
            Self::PaymentSelection => "payment_selection",
            Self::Legacy => "legacy",
        }
    }
}

/// One inbound customer event, already normalized by the channel crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnInput {
    Text(String),
    ButtonReply { id: String, title: String },
    ListReply { id: String, title: String },
}

impl TurnInput {
    /// The customer-visible text of the event, used for history and for
    /// text-based matching when a structured id is absent.
    pub fn display_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::ButtonReply { title, .. } | Self::ListReply { title, .. } => title,
        }
    }

    pub fn structured_id(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::ButtonReply { id, .. } | Self::ListReply { id, .. } => Some(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

/// Channel-neutral outbound message. The channel crate owns the
/// per-channel shape limits and truncation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundMessage {
    Text { body: String },
    Buttons { body: String, buttons: Vec<Choice> },
    List { body: String, button_label: String, rows: Vec<Row> },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Text { body } | Self::Buttons { body, .. } | Self::List { body, .. } => body,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SideEffect {
    Reply(OutboundMessage),
    CreateOrder(OrderDraft),
    DeleteConversation,
    NotifyOperator { detail: String },
}

/// What one turn produced: the conversation to persist (`None` means the
/// document must be deleted) and the effects to run, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub conversation: Option<Conversation>,
    pub effects: Vec<SideEffect>,
}

impl TurnOutcome {
    pub fn replies(conversation: Conversation, messages: Vec<OutboundMessage>) -> Self {
        Self {
            conversation: Some(conversation),
            effects: messages.into_iter().map(SideEffect::Reply).collect(),
        }
    }

    pub fn first_reply_body(&self) -> Option<&str> {
        self.effects.iter().find_map(|effect| match effect {
            SideEffect::Reply(message) => Some(message.body()),
            _ => None,
        })
    }
}
