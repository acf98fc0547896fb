pub mod engine;
pub mod states;

pub use engine::ConversationEngine;
pub use states::{FlowState, OutboundMessage, SideEffect, TurnInput, TurnOutcome};
