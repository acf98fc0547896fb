use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use comanda_agent::LlmIntentClassifier;
use comanda_channel::{CloudApiSender, ConversationService, MessageSender, OperatorAlerts};
use comanda_core::address_pipeline::AddressResolutionPipeline;
use comanda_core::catalog::Catalog;
use comanda_core::config::{AppConfig, ConfigError, LoadOptions};
use comanda_core::domain::conversation::PhoneNumber;
use comanda_core::flows::ConversationEngine;
use comanda_core::ports::GeocodeBias;
use comanda_db::{
    connect_with_settings, ensure_schema, DbPool, SqlConversationStore, SqlOrderGateway,
};

use crate::llm_http::HttpLlmClient;
use crate::places::GooglePlacesClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<ConversationService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("schema setup failed: {0}")]
    Schema(#[source] sqlx::Error),
    #[error("could not read menu file `{path}`: {source}")]
    MenuRead { path: PathBuf, source: std::io::Error },
    #[error("could not parse menu file `{path}`: {source}")]
    MenuParse { path: PathBuf, source: serde_json::Error },
    #[error("http client setup failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "bootstrap_start", store = %config.store.name);

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "database_connected");

    ensure_schema(&db_pool).await.map_err(BootstrapError::Schema)?;
    info!(event_name = "schema_ready");

    let catalog = load_menu(&config.store.menu_path).await?;
    info!(
        event_name = "menu_loaded",
        path = %config.store.menu_path,
        categories = catalog.categories.len(),
    );

    let geocode_client = http_client(config.geocode.timeout_secs)?;
    let llm_client = http_client(config.llm.timeout_secs)?;
    let channel_client = http_client(DEFAULT_CHANNEL_TIMEOUT_SECS)?;

    let bias = GeocodeBias { city: config.store.city.clone(), state: config.store.state.clone() };
    let addresses = Arc::new(AddressResolutionPipeline::new(
        Arc::new(GooglePlacesClient::new(geocode_client, &config.geocode)),
        bias,
    ));

    let classifier = Arc::new(LlmIntentClassifier::new(
        Arc::new(HttpLlmClient::new(llm_client, &config.llm)),
        config.store.clone(),
    ));

    let engine = Arc::new(ConversationEngine::new(
        catalog,
        config.store.clone(),
        classifier,
        addresses,
    ));

    let sender: Arc<dyn MessageSender> =
        Arc::new(CloudApiSender::new(channel_client, &config.channel));
    let operator_phone = config.store.operator_phone.clone().map(PhoneNumber);
    let notifier =
        Arc::new(OperatorAlerts::new(sender.clone(), operator_phone, config.store.name.clone()));

    let service = Arc::new(ConversationService::new(
        engine,
        Arc::new(SqlConversationStore::new(db_pool.clone())),
        Arc::new(SqlOrderGateway::new(db_pool.clone())),
        notifier,
        sender,
        config.store.id.clone(),
    ));

    info!(event_name = "bootstrap_complete");
    Ok(Application { config, db_pool, service })
}

const DEFAULT_CHANNEL_TIMEOUT_SECS: u64 = 15;

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, BootstrapError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(BootstrapError::HttpClient)
}

async fn load_menu(path: &str) -> Result<Catalog, BootstrapError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BootstrapError::MenuRead { path: PathBuf::from(path), source })?;
    serde_json::from_str(&raw)
        .map_err(|source| BootstrapError::MenuParse { path: PathBuf::from(path), source })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use comanda_core::config::{AppConfig, LogFormat};

    use super::{bootstrap_with_config, load_menu, BootstrapError};

    fn menu_json() -> &'static str {
        r#"{
            "categories": [{
                "id": "cat-marmitas",
                "name": "Marmitas",
                "items": [{
                    "id": "item-marmitex",
                    "name": "Marmitex",
                    "description": "Arroz, feijão e uma carne",
                    "base_price": "25.00",
                    "questions": []
                }]
            }]
        }"#
    }

    #[tokio::test]
    async fn bootstrap_loads_menu_and_prepares_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let menu_path = dir.path().join("menu.json");
        let mut file = std::fs::File::create(&menu_path).expect("menu file");
        file.write_all(menu_json().as_bytes()).expect("write menu");

        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:?cache=shared".to_owned();
        config.store.menu_path = menu_path.to_string_lossy().into_owned();
        config.logging.format = LogFormat::Compact;

        let app = bootstrap_with_config(config).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('conversations', 'orders')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("tables present");
        assert_eq!(table_count, 2);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn missing_menu_file_fails_bootstrap() {
        let result = load_menu("/nonexistent/menu.json").await;
        assert!(matches!(result, Err(BootstrapError::MenuRead { .. })));
    }
}
