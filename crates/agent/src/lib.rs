//! LLM-backed intent classification for the ordering conversation.
//!
//! The model is strictly a translator: it turns free-form customer text
//! into a structured `IntentResponse` and nothing else. Prices, cart
//! math, radius checks and state transitions are deterministic decisions
//! made by `comanda-core`; any unusable completion degrades to the
//! parser's fallback error action instead of failing the turn.

pub mod classifier;
pub mod llm;
pub mod prompt;

pub use classifier::LlmIntentClassifier;
pub use llm::LlmClient;
