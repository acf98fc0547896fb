use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::MenuItem;
use crate::customization::CustomizationSession;
use crate::domain::address::{PlaceCandidate, ResolvedAddress};
use crate::domain::cart::{CartItem, SelectedQuestion};
use crate::flows::states::FlowState;
use crate::matcher::AmbiguityGroup;

/// Documented idle window after which a conversation is considered
/// abandoned. Not enforced here; carried as a data point for a future
/// reaper job.
pub const CONVERSATION_TIMEOUT_SECS: u64 = 30 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    Delivery,
    Pickup,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Pix,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Dinheiro",
            Self::Card => "Cartão",
            Self::Pix => "Pix",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    Customer,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub text: String,
}

/// A matched item waiting for its customization walk to start. Items with
/// no questions skip the queue and land in the cart directly. A quantity
/// of zero marks a list pick whose quantity is asked after the walk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedItem {
    pub item: MenuItem,
    pub quantity: u32,
    /// Customization answers the customer named in the same sentence.
    #[serde(default)]
    pub preselected: Vec<SelectedQuestion>,
}

/// The central mutable aggregate: one per active phone number. Mutated by
/// exactly one turn at a time and persisted once per turn by the
/// coordinator, never by helpers mid-flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub phone: PhoneNumber,
    pub store_id: String,
    pub flow: FlowState,
    #[serde(default)]
    pub previous_flow: Option<FlowState>,
    #[serde(default)]
    pub delivery: Option<DeliveryKind>,
    #[serde(default)]
    pub address: Option<ResolvedAddress>,
    #[serde(default)]
    pub address_candidates: Vec<PlaceCandidate>,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(default)]
    pub pending: Option<CustomizationSession>,
    #[serde(default)]
    pub queued: Vec<QueuedItem>,
    /// A fully-customized item still waiting on the quantity question.
    #[serde(default)]
    pub awaiting_quantity: Option<CartItem>,
    /// Ordered by normalized phrase so repeated mentions of the same
    /// ambiguous phrase merge deterministically.
    #[serde(default)]
    pub ambiguities: BTreeMap<String, AmbiguityGroup>,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default)]
    pub payment: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(phone: PhoneNumber, store_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            phone,
            store_id: store_id.into(),
            flow: FlowState::Welcome,
            previous_flow: None,
            delivery: None,
            address: None,
            address_candidates: Vec::new(),
            cart: Vec::new(),
            pending: None,
            queued: Vec::new(),
            awaiting_quantity: None,
            ambiguities: BTreeMap::new(),
            history: Vec::new(),
            payment: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: FlowState) {
        if self.flow != next {
            self.previous_flow = Some(self.flow.clone());
            self.flow = next;
        }
        self.updated_at = Utc::now();
    }

    pub fn record_customer(&mut self, text: impl Into<String>) {
        self.history.push(HistoryTurn { role: HistoryRole::Customer, text: text.into() });
    }

    pub fn record_assistant(&mut self, text: impl Into<String>) {
        self.history.push(HistoryTurn { role: HistoryRole::Assistant, text: text.into() });
    }

    /// History rendered as the classifier's conversational context.
    pub fn history_for_prompt(&self) -> String {
        self.history
            .iter()
            .map(|turn| match turn.role {
                HistoryRole::Customer => format!("Cliente: {}", turn.text),
                HistoryRole::Assistant => format!("Atendente: {}", turn.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_pending_work(&self) -> bool {
        self.pending.is_some()
            || self.awaiting_quantity.is_some()
            || !self.queued.is_empty()
            || !self.ambiguities.is_empty()
    }
}
