//! Per-event coordinator: loads the conversation document, runs the
//! engine turn, persists the result once and executes the side effects
//! in order. Fatal turns are absorbed here so the customer always gets
//! an answer.

use std::sync::Arc;

use uuid::Uuid;

use comanda_core::domain::conversation::Conversation;
use comanda_core::errors::ApplicationError;
use comanda_core::flows::{ConversationEngine, SideEffect, TurnOutcome};
use comanda_core::ports::{ConversationStore, OperatorNotifier, OrderGateway};

use crate::events::InboundEvent;
use crate::messages::{render, ChannelMessage};
use crate::sender::MessageSender;

pub struct ConversationService {
    engine: Arc<ConversationEngine>,
    conversations: Arc<dyn ConversationStore>,
    orders: Arc<dyn OrderGateway>,
    notifier: Arc<dyn OperatorNotifier>,
    sender: Arc<dyn MessageSender>,
    store_id: String,
}

impl ConversationService {
    pub fn new(
        engine: Arc<ConversationEngine>,
        conversations: Arc<dyn ConversationStore>,
        orders: Arc<dyn OrderGateway>,
        notifier: Arc<dyn OperatorNotifier>,
        sender: Arc<dyn MessageSender>,
        store_id: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            conversations,
            orders,
            notifier,
            sender,
            store_id: store_id.into(),
        }
    }

    pub async fn handle_event(&self, event: InboundEvent) -> Result<(), ApplicationError> {
        let Some(input) = event.turn_input() else {
            tracing::debug!(event_name = "inbound_ignored", from = %event.from.0);
            return Ok(());
        };

        let conversation = match self.conversations.find(&event.from, &self.store_id).await? {
            Some(existing) => existing,
            None => Conversation::new(event.from.clone(), self.store_id.clone()),
        };

        match self.engine.handle_turn(conversation, input).await {
            Ok(outcome) => self.apply_outcome(&event, outcome).await,
            Err(error) => self.absorb_fatal(&event, error).await,
        }
    }

    async fn apply_outcome(
        &self,
        event: &InboundEvent,
        outcome: TurnOutcome,
    ) -> Result<(), ApplicationError> {
        if let Some(conversation) = &outcome.conversation {
            self.conversations.upsert(conversation).await?;
        }

        for effect in &outcome.effects {
            match effect {
                SideEffect::Reply(message) => {
                    self.sender.send(&event.from, &render(message)).await?;
                }
                SideEffect::CreateOrder(draft) => {
                    let order_id = self.orders.create_order(draft).await?;
                    tracing::info!(
                        event_name = "order_created",
                        order_id = %order_id.0,
                        phone = %event.from.0,
                        total = %draft.total,
                    );
                }
                SideEffect::DeleteConversation => {
                    self.conversations.delete(&event.from, &self.store_id).await?;
                }
                SideEffect::NotifyOperator { detail } => {
                    self.notifier.notify(&event.from, detail).await?;
                }
            }
        }

        Ok(())
    }

    /// A failed turn never reaches the customer as silence: log with a
    /// correlation id, alert the operator, apologize and reset the
    /// conversation.
    async fn absorb_fatal(
        &self,
        event: &InboundEvent,
        error: ApplicationError,
    ) -> Result<(), ApplicationError> {
        let correlation_id = Uuid::new_v4().to_string();
        tracing::error!(
            event_name = "turn_failed",
            correlation_id = %correlation_id,
            phone = %event.from.0,
            error = %error,
        );

        let interface = error.into_interface(correlation_id.clone());
        let apology = ChannelMessage::Text { body: interface.customer_message().to_owned() };

        if let Err(send_error) = self.sender.send(&event.from, &apology).await {
            tracing::error!(
                event_name = "apology_failed",
                correlation_id = %correlation_id,
                error = %send_error,
            );
        }
        if let Err(notify_error) = self
            .notifier
            .notify(&event.from, &format!("atendimento falhou (ref {correlation_id})"))
            .await
        {
            tracing::error!(
                event_name = "operator_alert_failed",
                correlation_id = %correlation_id,
                error = %notify_error,
            );
        }

        self.conversations.delete(&event.from, &self.store_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveTime;

    use rust_decimal::Decimal;

    use comanda_core::address_pipeline::AddressResolutionPipeline;
    use comanda_core::catalog::{Catalog, MenuItem, MenuItemId};
    use comanda_core::config::AppConfig;
    use comanda_core::domain::address::{PlaceCandidate, PlaceId, ResolvedAddress};
    use comanda_core::domain::cart::CartItem;
    use comanda_core::domain::conversation::{Conversation, PhoneNumber};
    use comanda_core::domain::order::{OrderDraft, OrderId};
    use comanda_core::errors::ApplicationError;
    use comanda_core::flows::{ConversationEngine, FlowState};
    use comanda_core::intent::IntentResponse;
    use comanda_core::ports::{
        ConversationStore, GeocodeBias, GeocodeClient, IntentClassifier, OperatorNotifier,
        OrderGateway,
    };
    use comanda_db::InMemoryConversationStore;

    use crate::events::{InboundEvent, InboundKind};
    use crate::messages::ChannelMessage;
    use crate::sender::MessageSender;

    use super::ConversationService;

    #[derive(Default)]
    struct CaptureSender {
        sent: Mutex<Vec<ChannelMessage>>,
    }

    #[async_trait]
    impl MessageSender for CaptureSender {
        async fn send(
            &self,
            _to: &PhoneNumber,
            message: &ChannelMessage,
        ) -> Result<(), ApplicationError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CaptureNotifier {
        alerts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OperatorNotifier for CaptureNotifier {
        async fn notify(
            &self,
            _phone: &PhoneNumber,
            detail: &str,
        ) -> Result<(), ApplicationError> {
            self.alerts.lock().unwrap().push(detail.to_owned());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CaptureOrders {
        created: Mutex<Vec<OrderDraft>>,
    }

    #[async_trait]
    impl OrderGateway for CaptureOrders {
        async fn create_order(&self, draft: &OrderDraft) -> Result<OrderId, ApplicationError> {
            self.created.lock().unwrap().push(draft.clone());
            Ok(OrderId::generate())
        }
    }

    struct StubClassifier;

    #[async_trait]
    impl IntentClassifier for StubClassifier {
        async fn classify(
            &self,
            _conversation: &Conversation,
            _catalog: &Catalog,
            _message: &str,
            _store_open: bool,
        ) -> IntentResponse {
            IntentResponse::fallback_error()
        }
    }

    struct StubGeocoder;

    #[async_trait]
    impl GeocodeClient for StubGeocoder {
        async fn autocomplete(
            &self,
            _input: &str,
            _bias: &GeocodeBias,
        ) -> Result<Vec<PlaceCandidate>, ApplicationError> {
            Ok(Vec::new())
        }

        async fn place_details(
            &self,
            place_id: &PlaceId,
        ) -> Result<ResolvedAddress, ApplicationError> {
            Ok(ResolvedAddress {
                place_id: place_id.clone(),
                latitude: 0.0,
                longitude: 0.0,
                formatted: String::new(),
                components: Default::default(),
            })
        }
    }

    struct Harness {
        service: ConversationService,
        store: Arc<InMemoryConversationStore>,
        orders: Arc<CaptureOrders>,
        sender: Arc<CaptureSender>,
        notifier: Arc<CaptureNotifier>,
    }

    fn harness() -> Harness {
        let mut store_config = AppConfig::default().store;
        store_config.id = "store-1".to_owned();
        store_config.name = "Marmitaria do Centro".to_owned();
        store_config.opens_at = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        store_config.closes_at = NaiveTime::from_hms_opt(23, 59, 59).unwrap();

        let bias = GeocodeBias { city: String::new(), state: String::new() };
        let engine = Arc::new(ConversationEngine::new(
            Catalog::default(),
            store_config,
            Arc::new(StubClassifier),
            Arc::new(AddressResolutionPipeline::new(Arc::new(StubGeocoder), bias)),
        ));

        let store = Arc::new(InMemoryConversationStore::default());
        let orders = Arc::new(CaptureOrders::default());
        let sender = Arc::new(CaptureSender::default());
        let notifier = Arc::new(CaptureNotifier::default());
        let service = ConversationService::new(
            engine,
            store.clone(),
            orders.clone(),
            notifier.clone(),
            sender.clone(),
            "store-1",
        );

        Harness { service, store, orders, sender, notifier }
    }

    fn phone() -> PhoneNumber {
        PhoneNumber("5511999990000".to_owned())
    }

    fn text_event(message: &str) -> InboundEvent {
        InboundEvent { from: phone(), kind: InboundKind::Text { text: message.to_owned() } }
    }

    #[tokio::test]
    async fn first_message_creates_and_persists_a_conversation() {
        let h = harness();
        h.service.handle_event(text_event("oi")).await.expect("event");

        let convo = h.store.find(&phone(), "store-1").await.expect("find").expect("persisted");
        assert_eq!(convo.flow, FlowState::DeliveryType);

        let sent = h.sender.sent.lock().unwrap();
        assert!(matches!(sent.as_slice(), [ChannelMessage::Buttons { .. }]));
    }

    #[tokio::test]
    async fn unsupported_event_is_ignored() {
        let h = harness();
        h.service
            .handle_event(InboundEvent {
                from: phone(),
                kind: InboundKind::Unsupported { event_type: "audio".to_owned() },
            })
            .await
            .expect("event");

        assert!(h.sender.sent.lock().unwrap().is_empty());
        assert!(h.store.find(&phone(), "store-1").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn confirmed_order_alerts_the_operator() {
        let h = harness();

        let guarana = MenuItem {
            id: MenuItemId("guarana".to_owned()),
            name: "Guaraná Lata".to_owned(),
            description: None,
            base_price: Decimal::new(600, 2),
            available_on: Default::default(),
            questions: Vec::new(),
        };
        let mut paying = Conversation::new(phone(), "store-1");
        paying.flow = FlowState::PaymentSelection;
        paying.cart.push(CartItem::from_menu_item(&guarana, 2));
        h.store.upsert(&paying).await.expect("seed");

        h.service.handle_event(text_event("vou pagar no pix")).await.expect("event");

        assert_eq!(h.orders.created.lock().unwrap().len(), 1);
        let alerts = h.notifier.alerts.lock().unwrap();
        assert!(matches!(alerts.as_slice(), [detail] if detail.contains("novo pedido")));
        drop(alerts);
        assert!(h.store.find(&phone(), "store-1").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn fatal_turn_apologizes_alerts_and_resets() {
        let h = harness();

        let mut broken = Conversation::new(phone(), "store-1");
        broken.flow = FlowState::Legacy;
        h.store.upsert(&broken).await.expect("seed");

        h.service.handle_event(text_event("oi")).await.expect("event");

        let sent = h.sender.sent.lock().unwrap();
        assert!(matches!(
            sent.as_slice(),
            [ChannelMessage::Text { body }] if body.contains("Não consegui entender")
        ));
        drop(sent);

        assert_eq!(h.notifier.alerts.lock().unwrap().len(), 1);
        assert!(h.store.find(&phone(), "store-1").await.expect("find").is_none());
    }
}
