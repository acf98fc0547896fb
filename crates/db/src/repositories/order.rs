use async_trait::async_trait;

use comanda_core::domain::order::{OrderDraft, OrderId};
use comanda_core::errors::ApplicationError;
use comanda_core::ports::OrderGateway;

use super::{decode, persistence};
use crate::DbPool;

pub struct SqlOrderGateway {
    pool: DbPool,
}

impl SqlOrderGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderGateway for SqlOrderGateway {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, ApplicationError> {
        let id = OrderId::generate();
        let document = serde_json::to_string(draft).map_err(decode)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, phone, store_id, document, total, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.0.to_string())
        .bind(&draft.phone.0)
        .bind(&draft.store_id)
        .bind(document)
        .bind(draft.total.to_string())
        .bind(draft.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        tracing::info!(
            event_name = "order_persisted",
            order_id = %id.0,
            store_id = %draft.store_id,
            total = %draft.total,
        );
        Ok(id)
    }
}
