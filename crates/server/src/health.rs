//! Liveness endpoint; degraded means the process is up but sqlite is
//! not answering.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use comanda_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let probe = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.db_pool).await;

    let payload = match probe {
        Ok(_) => HealthResponse {
            status: "ready",
            database: "ready",
            detail: None,
            checked_at: Utc::now().to_rfc3339(),
        },
        Err(error) => HealthResponse {
            status: "degraded",
            database: "unreachable",
            detail: Some(error.to_string()),
            checked_at: Utc::now().to_rfc3339(),
        },
    };

    let code = if payload.status == "ready" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(payload))
}
