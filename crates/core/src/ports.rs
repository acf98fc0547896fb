//! Outbound ports. The engine and coordinator depend on these traits;
//! the agent, db and server crates provide the implementations.

use async_trait::async_trait;

use crate::catalog::Catalog;
use crate::domain::address::{PlaceCandidate, PlaceId, ResolvedAddress};
use crate::domain::conversation::{Conversation, PhoneNumber};
use crate::domain::order::{OrderDraft, OrderId};
use crate::errors::ApplicationError;
use crate::intent::IntentResponse;

/// Geographic bias applied to address autocompletion so candidates
/// cluster around the store's city.
#[derive(Clone, Debug, PartialEq)]
pub struct GeocodeBias {
    pub city: String,
    pub state: String,
}

/// Classifies one customer message into a structured intent. Total by
/// contract: implementations absorb upstream failures into the
/// restart-intent fallback rather than erroring the turn.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        conversation: &Conversation,
        catalog: &Catalog,
        message: &str,
        store_open: bool,
    ) -> IntentResponse;
}

#[async_trait]
pub trait GeocodeClient: Send + Sync {
    async fn autocomplete(
        &self,
        input: &str,
        bias: &GeocodeBias,
    ) -> Result<Vec<PlaceCandidate>, ApplicationError>;

    async fn place_details(&self, place_id: &PlaceId) -> Result<ResolvedAddress, ApplicationError>;
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find(
        &self,
        phone: &PhoneNumber,
        store_id: &str,
    ) -> Result<Option<Conversation>, ApplicationError>;

    async fn upsert(&self, conversation: &Conversation) -> Result<(), ApplicationError>;

    async fn delete(&self, phone: &PhoneNumber, store_id: &str) -> Result<(), ApplicationError>;
}

/// Hands a finished draft to the order backend.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, ApplicationError>;
}

/// Alerts a human operator when a conversation dies on a fatal error.
#[async_trait]
pub trait OperatorNotifier: Send + Sync {
    async fn notify(&self, phone: &PhoneNumber, detail: &str) -> Result<(), ApplicationError>;
}
