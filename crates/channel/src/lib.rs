pub mod cloud_api;
pub mod events;
pub mod messages;
pub mod sender;
pub mod service;
pub mod webhook;

pub use cloud_api::CloudApiSender;
pub use events::{InboundEvent, InboundKind};
pub use messages::{render, ChannelMessage};
pub use sender::{MessageSender, NoopSender, OperatorAlerts};
pub use service::ConversationService;
pub use webhook::{parse_events, WebhookPayload};
