use std::sync::Arc;

use async_trait::async_trait;

use comanda_core::catalog::Catalog;
use comanda_core::config::StoreConfig;
use comanda_core::domain::conversation::Conversation;
use comanda_core::intent::{parse_intent, IntentResponse};
use comanda_core::ports::IntentClassifier;

use crate::llm::LlmClient;
use crate::prompt;

/// Classifier backed by a chat model. Total by contract: any transport
/// or parsing failure degrades to the restart-intent fallback so the
/// conversation never dies on a bad completion.
pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmClient>,
    store: StoreConfig,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, store: StoreConfig) -> Self {
        Self { llm, store }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        conversation: &Conversation,
        catalog: &Catalog,
        message: &str,
        store_open: bool,
    ) -> IntentResponse {
        let system = prompt::system_prompt(&self.store);
        let user = prompt::user_context(conversation, catalog, message, store_open);

        match self.llm.complete(&system, &user).await {
            Ok(raw) => {
                let response = parse_intent(&raw);
                tracing::debug!(
                    event_name = "intent_classified",
                    action = ?response.action,
                    items = response.items.len(),
                );
                response
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "intent_classification_failed",
                    error = %error,
                );
                IntentResponse::fallback_error()
            }
        }
    }
}
