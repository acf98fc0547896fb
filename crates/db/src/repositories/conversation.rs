use async_trait::async_trait;
use sqlx::Row;

use comanda_core::domain::conversation::{Conversation, PhoneNumber};
use comanda_core::errors::ApplicationError;
use comanda_core::ports::ConversationStore;

use super::{decode, persistence};
use crate::DbPool;

pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for SqlConversationStore {
    async fn find(
        &self,
        phone: &PhoneNumber,
        store_id: &str,
    ) -> Result<Option<Conversation>, ApplicationError> {
        let row = sqlx::query(
            "SELECT document FROM conversations WHERE phone = ? AND store_id = ?",
        )
        .bind(&phone.0)
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(|row| {
            let document: String = row.get("document");
            serde_json::from_str(&document).map_err(decode)
        })
        .transpose()
    }

    async fn upsert(&self, conversation: &Conversation) -> Result<(), ApplicationError> {
        let document = serde_json::to_string(conversation).map_err(decode)?;
        sqlx::query(
            r#"
            INSERT INTO conversations (phone, store_id, document, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (phone, store_id)
            DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at
            "#,
        )
        .bind(&conversation.phone.0)
        .bind(&conversation.store_id)
        .bind(document)
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn delete(&self, phone: &PhoneNumber, store_id: &str) -> Result<(), ApplicationError> {
        sqlx::query("DELETE FROM conversations WHERE phone = ? AND store_id = ?")
            .bind(&phone.0)
            .bind(store_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use comanda_core::domain::conversation::{Conversation, PhoneNumber};
    use comanda_core::flows::FlowState;
    use comanda_core::ports::ConversationStore;

    use crate::{connect, ensure_schema};

    use super::SqlConversationStore;

    async fn store() -> SqlConversationStore {
        let pool = connect("sqlite::memory:").await.expect("pool");
        ensure_schema(&pool).await.expect("schema");
        SqlConversationStore::new(pool)
    }

    fn phone() -> PhoneNumber {
        PhoneNumber("5511999990000".to_owned())
    }

    #[tokio::test]
    async fn round_trips_the_full_document() {
        let store = store().await;
        let mut convo = Conversation::new(phone(), "store-1");
        convo.transition(FlowState::Categories);
        convo.record_customer("quero uma marmita");

        store.upsert(&convo).await.expect("upsert");
        let loaded = store.find(&phone(), "store-1").await.expect("find").expect("present");
        assert_eq!(loaded, convo);
    }

    #[tokio::test]
    async fn upsert_replaces_the_previous_document() {
        let store = store().await;
        let mut convo = Conversation::new(phone(), "store-1");
        store.upsert(&convo).await.expect("insert");

        convo.transition(FlowState::DeliveryType);
        store.upsert(&convo).await.expect("update");

        let loaded = store.find(&phone(), "store-1").await.expect("find").expect("present");
        assert_eq!(loaded.flow, FlowState::DeliveryType);
    }

    #[tokio::test]
    async fn delete_removes_the_document() {
        let store = store().await;
        store.upsert(&Conversation::new(phone(), "store-1")).await.expect("insert");
        store.delete(&phone(), "store-1").await.expect("delete");
        assert!(store.find(&phone(), "store-1").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn documents_are_scoped_by_store() {
        let store = store().await;
        store.upsert(&Conversation::new(phone(), "store-1")).await.expect("insert");
        assert!(store.find(&phone(), "store-2").await.expect("find").is_none());
    }
}
