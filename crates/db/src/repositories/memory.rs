use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use comanda_core::domain::conversation::{Conversation, PhoneNumber};
use comanda_core::errors::ApplicationError;
use comanda_core::ports::ConversationStore;

/// Keyed by (phone, store_id), like the sqlite table.
#[derive(Default)]
pub struct InMemoryConversationStore {
    documents: RwLock<HashMap<(String, String), Conversation>>,
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find(
        &self,
        phone: &PhoneNumber,
        store_id: &str,
    ) -> Result<Option<Conversation>, ApplicationError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&(phone.0.clone(), store_id.to_owned())).cloned())
    }

    async fn upsert(&self, conversation: &Conversation) -> Result<(), ApplicationError> {
        let mut documents = self.documents.write().await;
        documents.insert(
            (conversation.phone.0.clone(), conversation.store_id.clone()),
            conversation.clone(),
        );
        Ok(())
    }

    async fn delete(&self, phone: &PhoneNumber, store_id: &str) -> Result<(), ApplicationError> {
        let mut documents = self.documents.write().await;
        documents.remove(&(phone.0.clone(), store_id.to_owned()));
        Ok(())
    }
}
