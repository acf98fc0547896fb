pub mod address_pipeline;
pub mod catalog;
pub mod config;
pub mod customization;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod geo;
pub mod intent;
pub mod matcher;
pub mod ports;
pub mod pricing;

pub use address_pipeline::{AddressResolutionPipeline, LookupOutcome};
pub use catalog::{
    Answer, AnswerId, Catalog, Category, CategoryId, MenuItem, MenuItemId, Question, QuestionId,
    QuestionKind, WeekdayAvailability,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, StoreConfig};
pub use customization::{AnswerInput, CustomizationSession, StepOutcome};
pub use domain::address::{PlaceCandidate, PlaceId, ResolvedAddress};
pub use domain::cart::{CartItem, SelectedAnswer, SelectedQuestion};
pub use domain::conversation::{Conversation, DeliveryKind, PaymentMethod, PhoneNumber};
pub use domain::order::{OrderDraft, OrderId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{ConversationEngine, FlowState, OutboundMessage, SideEffect, TurnInput, TurnOutcome};
pub use intent::{parse_intent, IntentAction, IntentItem, IntentResponse};
pub use matcher::{MatchOutcome, MatcherStack};
pub use ports::{
    ConversationStore, GeocodeBias, GeocodeClient, IntentClassifier, OperatorNotifier, OrderGateway,
};
pub use pricing::{order_totals, render_summary, OrderTotals};
