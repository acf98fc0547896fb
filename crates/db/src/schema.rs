//! Idempotent schema bootstrap, run once at startup. The conversation
//! document is stored as JSON: the flow state machine evolves faster
//! than a normalized schema would keep up with.

use crate::DbPool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS conversations (
        phone       TEXT NOT NULL,
        store_id    TEXT NOT NULL,
        document    TEXT NOT NULL,
        updated_at  TEXT NOT NULL,
        PRIMARY KEY (phone, store_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id          TEXT PRIMARY KEY,
        phone       TEXT NOT NULL,
        store_id    TEXT NOT NULL,
        document    TEXT NOT NULL,
        total       TEXT NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_phone ON orders (phone, store_id)",
];

pub async fn ensure_schema(pool: &DbPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use crate::connect;

    use super::ensure_schema;

    #[tokio::test]
    async fn schema_bootstrap_is_idempotent() {
        let pool = connect("sqlite::memory:").await.expect("pool");
        ensure_schema(&pool).await.expect("first run");
        ensure_schema(&pool).await.expect("second run");

        let row = sqlx::query(
            "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name IN ('conversations', 'orders')",
        )
        .fetch_one(&pool)
        .await
        .expect("query");
        let n: i64 = row.get("n");
        assert_eq!(n, 2);
    }
}
