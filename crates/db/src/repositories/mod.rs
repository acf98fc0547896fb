pub mod conversation;
pub mod memory;
pub mod order;

pub use conversation::SqlConversationStore;
pub use memory::InMemoryConversationStore;
pub use order::SqlOrderGateway;

use comanda_core::errors::ApplicationError;

pub(crate) fn persistence(error: sqlx::Error) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

pub(crate) fn decode(error: serde_json::Error) -> ApplicationError {
    ApplicationError::Persistence(format!("document decode failed: {error}"))
}
