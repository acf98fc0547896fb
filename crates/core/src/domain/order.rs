use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::address::ResolvedAddress;
use crate::domain::cart::CartItem;
use crate::domain::conversation::{Conversation, DeliveryKind, PaymentMethod, PhoneNumber};
use crate::pricing::OrderTotals;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Immutable snapshot handed to the order gateway once cart, address, and
/// payment are final. One-way: the conversation is deleted right after.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub phone: PhoneNumber,
    pub store_id: String,
    pub items: Vec<CartItem>,
    pub delivery: DeliveryKind,
    #[serde(default)]
    pub address: Option<ResolvedAddress>,
    pub payment: PaymentMethod,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderDraft {
    pub fn from_conversation(
        conversation: &Conversation,
        payment: PaymentMethod,
        totals: &OrderTotals,
    ) -> Self {
        Self {
            phone: conversation.phone.clone(),
            store_id: conversation.store_id.clone(),
            items: conversation.cart.clone(),
            delivery: conversation.delivery.unwrap_or(DeliveryKind::Pickup),
            address: conversation.address.clone(),
            payment,
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            total: totals.total,
            created_at: Utc::now(),
        }
    }
}
