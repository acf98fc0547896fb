use std::sync::Arc;

use async_trait::async_trait;

use comanda_core::domain::conversation::PhoneNumber;
use comanda_core::errors::ApplicationError;
use comanda_core::ports::OperatorNotifier;

use crate::messages::ChannelMessage;

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(
        &self,
        to: &PhoneNumber,
        message: &ChannelMessage,
    ) -> Result<(), ApplicationError>;
}

/// Sender that drops everything. Used in tests and dry runs.
#[derive(Default)]
pub struct NoopSender;

#[async_trait]
impl MessageSender for NoopSender {
    async fn send(
        &self,
        to: &PhoneNumber,
        _message: &ChannelMessage,
    ) -> Result<(), ApplicationError> {
        tracing::debug!(event_name = "message_dropped", to = %to.0);
        Ok(())
    }
}

/// Forwards operator alerts over the same message channel. With no
/// operator phone configured, alerts end up in the log only.
pub struct OperatorAlerts {
    sender: Arc<dyn MessageSender>,
    operator_phone: Option<PhoneNumber>,
    store_name: String,
}

impl OperatorAlerts {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        operator_phone: Option<PhoneNumber>,
        store_name: impl Into<String>,
    ) -> Self {
        Self { sender, operator_phone, store_name: store_name.into() }
    }
}

#[async_trait]
impl OperatorNotifier for OperatorAlerts {
    async fn notify(&self, phone: &PhoneNumber, detail: &str) -> Result<(), ApplicationError> {
        let Some(operator) = &self.operator_phone else {
            tracing::warn!(
                event_name = "operator_alert_unrouted",
                customer = %phone.0,
                detail = %detail,
            );
            return Ok(());
        };

        let body = format!("[{}] cliente {}: {}", self.store_name, phone.0, detail);
        self.sender.send(operator, &ChannelMessage::Text { body }).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use comanda_core::domain::conversation::PhoneNumber;
    use comanda_core::errors::ApplicationError;
    use comanda_core::ports::OperatorNotifier;

    use crate::messages::ChannelMessage;

    use super::{MessageSender, NoopSender, OperatorAlerts};

    #[derive(Default)]
    struct CaptureSender {
        sent: Mutex<Vec<(PhoneNumber, ChannelMessage)>>,
    }

    #[async_trait]
    impl MessageSender for CaptureSender {
        async fn send(
            &self,
            to: &PhoneNumber,
            message: &ChannelMessage,
        ) -> Result<(), ApplicationError> {
            self.sent.lock().unwrap().push((to.clone(), message.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn alerts_are_routed_to_the_operator_number() {
        let sender = Arc::new(CaptureSender::default());
        let alerts = OperatorAlerts::new(
            sender.clone(),
            Some(PhoneNumber("5511888887777".to_owned())),
            "Marmitaria do Centro",
        );

        alerts
            .notify(&PhoneNumber("5511999990000".to_owned()), "novo pedido: 2 itens")
            .await
            .expect("notify");

        let sent = sender.sent.lock().unwrap();
        let (to, message) = &sent[0];
        assert_eq!(to.0, "5511888887777");
        assert!(matches!(
            message,
            ChannelMessage::Text { body }
                if body.contains("cliente 5511999990000") && body.contains("novo pedido")
        ));
    }

    #[tokio::test]
    async fn missing_operator_number_swallows_the_alert() {
        let alerts = OperatorAlerts::new(Arc::new(NoopSender), None, "Marmitaria do Centro");
        alerts
            .notify(&PhoneNumber("5511999990000".to_owned()), "detalhe")
            .await
            .expect("notify");
    }

    #[tokio::test]
    async fn noop_sender_accepts_any_message() {
        NoopSender
            .send(
                &PhoneNumber("5511999990000".to_owned()),
                &ChannelMessage::Text { body: "oi".to_owned() },
            )
            .await
            .expect("send");
    }
}
