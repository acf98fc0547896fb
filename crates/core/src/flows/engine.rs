//! The per-turn state machine. Holds no mutable state of its own: every
//! turn receives the conversation document, mutates it, and hands back
//! the outcome for the coordinator to persist and execute.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveTime};
use rust_decimal::Decimal;

use crate::address_pipeline::{AddressResolutionPipeline, LookupOutcome};
use crate::catalog::{format_price, Catalog, CategoryId, MenuItem, MenuItemId, Question, QuestionKind};
use crate::config::StoreConfig;
use crate::customization::{AnswerInput, CustomizationSession, StepOutcome};
use crate::domain::cart::CartItem;
use crate::domain::conversation::{Conversation, DeliveryKind, PaymentMethod, QueuedItem};
use crate::domain::order::OrderDraft;
use crate::errors::{ApplicationError, DomainError};
use crate::flows::states::{
    Choice, FlowState, OutboundMessage, Row, SideEffect, TurnInput, TurnOutcome,
};
use crate::geo::validate_radius;
use crate::intent::{IntentAction, IntentResponse};
use crate::matcher::text::{normalize, number_word};
use crate::matcher::{
    required_questions_satisfied, AmbiguityGroup, MatchInput, MatchOutcome, MatcherStack,
};
use crate::ports::IntentClassifier;
use crate::pricing::{order_totals, render_summary};

const DONE_KEYWORDS: &[&str] = &["pronto", "so isso", "mais nada", "nada", "e so"];
const SKIP_KEYWORDS: &[&str] = &["pular", "sem adicional", "nao quero", "nenhum", "nenhuma"];

pub struct ConversationEngine {
    catalog: Catalog,
    store: StoreConfig,
    matcher: MatcherStack,
    classifier: Arc<dyn IntentClassifier>,
    addresses: Arc<AddressResolutionPipeline>,
}

/// What one state handler decided for the turn.
enum Step {
    /// Persist the conversation and send these replies.
    Continue(Vec<OutboundMessage>),
    /// The conversation is over: delete the document, run these effects.
    Finish(Vec<SideEffect>),
}

impl ConversationEngine {
    pub fn new(
        catalog: Catalog,
        store: StoreConfig,
        classifier: Arc<dyn IntentClassifier>,
        addresses: Arc<AddressResolutionPipeline>,
    ) -> Self {
        Self { catalog, store, matcher: MatcherStack::default(), classifier, addresses }
    }

    pub async fn handle_turn(
        &self,
        mut convo: Conversation,
        input: TurnInput,
    ) -> Result<TurnOutcome, ApplicationError> {
        convo.record_customer(input.display_text().to_owned());

        let step = match convo.flow.clone() {
            FlowState::Welcome => self.on_welcome(&mut convo),
            FlowState::DeliveryType => self.on_delivery_type(&mut convo, &input),
            FlowState::NewAddress => self.on_new_address(&mut convo, &input).await?,
            FlowState::AddressConfirmation => {
                self.on_address_confirmation(&mut convo, &input).await?
            }
            FlowState::Categories => self.on_categories(&mut convo, &input).await,
            FlowState::Products => self.on_products(&mut convo, &input).await,
            FlowState::ProductQuestions => self.on_product_questions(&mut convo, &input).await,
            FlowState::ProductQuantity => self.on_product_quantity(&mut convo, &input),
            FlowState::OrderSummary => self.on_order_summary(&mut convo, &input),
            FlowState::PaymentSelection => self.on_payment_selection(&mut convo, &input),
            FlowState::Legacy => {
                return Err(DomainError::UnknownFlowState(
                    "document carries a retired flow state".to_owned(),
                )
                .into());
            }
        };

        Ok(match step {
            Step::Continue(messages) => {
                // Every outbound body lands in the history, otherwise the
                // classifier loses the question the customer is answering
                // on multi-message turns.
                for message in &messages {
                    convo.record_assistant(message.body().to_owned());
                }
                TurnOutcome::replies(convo, messages)
            }
            Step::Finish(effects) => TurnOutcome { conversation: None, effects },
        })
    }

    fn on_welcome(&self, convo: &mut Conversation) -> Step {
        let now = Local::now();
        if !self.store.is_open(now.weekday(), now.time()) {
            let body = format!(
                "Olá! A {} está fechada no momento. Nosso horário é das {} às {}.",
                self.store.name,
                format_time(self.store.opens_at),
                format_time(self.store.closes_at),
            );
            return Step::Finish(vec![
                SideEffect::Reply(OutboundMessage::text(body)),
                SideEffect::DeleteConversation,
            ]);
        }

        convo.transition(FlowState::DeliveryType);
        Step::Continue(vec![OutboundMessage::Buttons {
            body: format!(
                "Olá! Bem-vindo à {}. Seu pedido é para entrega ou retirada?",
                self.store.name
            ),
            buttons: vec![
                Choice { id: "delivery".to_owned(), title: "Entrega".to_owned() },
                Choice { id: "pickup".to_owned(), title: "Retirada".to_owned() },
            ],
        }])
    }

    fn on_delivery_type(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        let chosen = match input.structured_id() {
            Some("delivery") => Some(DeliveryKind::Delivery),
            Some("pickup") => Some(DeliveryKind::Pickup),
            _ => {
                let text = normalize(input.display_text());
                if text.contains("entrega") || text.contains("receber") {
                    Some(DeliveryKind::Delivery)
                } else if text.contains("retira") || text.contains("buscar") {
                    Some(DeliveryKind::Pickup)
                } else {
                    None
                }
            }
        };

        match chosen {
            Some(DeliveryKind::Delivery) => {
                convo.delivery = Some(DeliveryKind::Delivery);
                convo.transition(FlowState::NewAddress);
                Step::Continue(vec![OutboundMessage::text(
                    "Perfeito! Me envie seu endereço com rua e número, por favor.",
                )])
            }
            Some(DeliveryKind::Pickup) => {
                convo.delivery = Some(DeliveryKind::Pickup);
                convo.transition(FlowState::Categories);
                Step::Continue(vec![self.categories_list("O que você gostaria de pedir?")])
            }
            None => Step::Continue(vec![OutboundMessage::Buttons {
                body: "Não entendi. Seu pedido é para entrega ou retirada?".to_owned(),
                buttons: vec![
                    Choice { id: "delivery".to_owned(), title: "Entrega".to_owned() },
                    Choice { id: "pickup".to_owned(), title: "Retirada".to_owned() },
                ],
            }]),
        }
    }

    async fn on_new_address(
        &self,
        convo: &mut Conversation,
        input: &TurnInput,
    ) -> Result<Step, ApplicationError> {
        let outcome = self.addresses.lookup(input.display_text()).await?;
        Ok(match outcome {
            LookupOutcome::NoMatch => Step::Continue(vec![OutboundMessage::text(
                "Não encontrei esse endereço. Pode conferir e enviar de novo, com rua e número?",
            )]),
            LookupOutcome::Single(candidate) => {
                let display = candidate.display();
                convo.address_candidates = vec![candidate];
                convo.transition(FlowState::AddressConfirmation);
                Step::Continue(vec![OutboundMessage::Buttons {
                    body: format!("Encontrei este endereço:\n{display}\nEstá correto?"),
                    buttons: vec![
                        Choice { id: "address_yes".to_owned(), title: "Sim".to_owned() },
                        Choice { id: "address_no".to_owned(), title: "Não".to_owned() },
                    ],
                }])
            }
            LookupOutcome::Multiple(candidates) => {
                let rows = candidates
                    .iter()
                    .map(|candidate| Row {
                        id: format!("addr:{}", candidate.place_id.0),
                        title: candidate.main_text.clone(),
                        description: Some(candidate.secondary_text.clone()),
                    })
                    .collect();
                convo.address_candidates = candidates;
                convo.transition(FlowState::AddressConfirmation);
                Step::Continue(vec![OutboundMessage::List {
                    body: "Encontrei alguns endereços parecidos. Qual deles é o seu?".to_owned(),
                    button_label: "Ver endereços".to_owned(),
                    rows,
                }])
            }
        })
    }

    async fn on_address_confirmation(
        &self,
        convo: &mut Conversation,
        input: &TurnInput,
    ) -> Result<Step, ApplicationError> {
        let picked = match input.structured_id() {
            Some("address_no") => {
                convo.address_candidates.clear();
                convo.transition(FlowState::NewAddress);
                return Ok(Step::Continue(vec![OutboundMessage::text(
                    "Sem problema. Me envie o endereço de novo, com rua e número.",
                )]));
            }
            Some("address_yes") => convo.address_candidates.first().cloned(),
            Some(id) => id.strip_prefix("addr:").and_then(|place_id| {
                convo.address_candidates.iter().find(|c| c.place_id.0 == place_id).cloned()
            }),
            None => {
                let text = normalize(input.display_text());
                if text == "sim" || text.contains("correto") || text.contains("isso") {
                    convo.address_candidates.first().cloned()
                } else if text == "nao" {
                    convo.address_candidates.clear();
                    convo.transition(FlowState::NewAddress);
                    return Ok(Step::Continue(vec![OutboundMessage::text(
                        "Sem problema. Me envie o endereço de novo, com rua e número.",
                    )]));
                } else {
                    None
                }
            }
        };

        let Some(candidate) = picked else {
            return Ok(Step::Continue(vec![OutboundMessage::text(
                "Não entendi. Escolha um dos endereços da lista ou responda sim ou não.",
            )]));
        };

        let resolved = self.addresses.resolve(&candidate.place_id).await?;
        let check = validate_radius(
            self.store.latitude,
            self.store.longitude,
            resolved.latitude,
            resolved.longitude,
            self.store.delivery_max_radius_km,
        );

        if !check.is_within_radius {
            tracing::info!(
                event_name = "delivery_radius_rejected",
                phone = %convo.phone.0,
                distance_km = check.distance_km,
                max_radius_km = self.store.delivery_max_radius_km,
            );
            convo.address_candidates.clear();
            convo.transition(FlowState::NewAddress);
            return Ok(Step::Continue(vec![OutboundMessage::text(format!(
                "Que pena! Esse endereço fica a {:.1} km da loja e entregamos em até {:.0} km. \
                 Tem outro endereço dentro da área?",
                check.distance_km, self.store.delivery_max_radius_km,
            ))]));
        }

        convo.address = Some(resolved.clone());
        convo.address_candidates.clear();
        convo.transition(FlowState::Categories);
        Ok(Step::Continue(vec![
            OutboundMessage::text(format!("Endereço confirmado: {}.", resolved.formatted)),
            self.categories_list("O que você gostaria de pedir?"),
        ]))
    }

    async fn on_categories(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        if let Some(id) = input.structured_id() {
            if let Some(category_id) = id.strip_prefix("cat:") {
                let Some(category) = self.catalog.find_category(&CategoryId(category_id.to_owned()))
                else {
                    return Step::Continue(vec![
                        self.categories_list("Essa opção não está mais disponível. Escolha uma categoria:")
                    ]);
                };
                let prompt = self.products_list(category);
                convo.transition(FlowState::Products);
                return Step::Continue(vec![prompt]);
            }
        }

        self.on_products(convo, input).await
    }

    async fn on_products(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        if !convo.ambiguities.is_empty() {
            return self.resolve_ambiguity(convo, input);
        }

        if let Some(id) = input.structured_id() {
            if let Some(item_id) = id.strip_prefix("item:") {
                let Some(item) = self.catalog.find_item(&MenuItemId(item_id.to_owned())).cloned()
                else {
                    return Step::Continue(vec![
                        self.categories_list("Esse item não está mais disponível. O que você gostaria?")
                    ]);
                };
                // Questions come before the quantity: the walk starts now
                // and the quantity of zero is resolved once the item is
                // fully customized.
                convo.queued.insert(0, QueuedItem { item, quantity: 0, preselected: Vec::new() });
                return Step::Continue(vec![self.advance(convo, None)]);
            }
            if id == "order_finish" {
                return self.enter_summary(convo);
            }
            if id == "order_more" {
                convo.transition(FlowState::Categories);
                return Step::Continue(vec![self.categories_list("O que mais você gostaria?")]);
            }
        }

        self.match_free_text(convo, input.display_text()).await
    }

    /// Free text in the ordering states: deterministic matching first,
    /// classifier second, conversational reply last.
    async fn match_free_text(&self, convo: &mut Conversation, text: &str) -> Step {
        let day = Local::now().weekday();
        let mut outcome =
            self.matcher.resolve(&MatchInput { text, intent_items: &[] }, &self.catalog, day);

        let mut intent: Option<IntentResponse> = None;
        if outcome.is_empty() {
            let now = Local::now();
            let store_open = self.store.is_open(now.weekday(), now.time());
            let response = self.classifier.classify(convo, &self.catalog, text, store_open).await;

            match response.action {
                IntentAction::OrderFinished if !convo.cart.is_empty() => {
                    return self.enter_summary(convo);
                }
                IntentAction::Ordering if !response.items.is_empty() => {
                    outcome = self.matcher.resolve(
                        &MatchInput { text, intent_items: &response.items },
                        &self.catalog,
                        day,
                    );
                    intent = Some(response);
                }
                _ => {
                    return Step::Continue(vec![OutboundMessage::text(response.message)]);
                }
            }
        }

        if outcome.is_empty() {
            let body = intent
                .map(|response| response.message)
                .unwrap_or_else(|| "Não encontrei esse item no cardápio. Pode tentar de outro jeito?".to_owned());
            return Step::Continue(vec![OutboundMessage::text(body)]);
        }

        let lead_in = self.apply_match_outcome(convo, outcome);
        Step::Continue(vec![self.advance(convo, lead_in)])
    }

    /// Moves resolved mentions into the cart or the customization queue
    /// and merges ambiguity groups. Returns the confirmation lead-in for
    /// items that went straight to the cart.
    fn apply_match_outcome(&self, convo: &mut Conversation, outcome: MatchOutcome) -> Option<String> {
        let mut added = Vec::new();

        for mention in outcome.resolved {
            if mention.item.has_questions()
                && !required_questions_satisfied(&mention.item, &mention.preselected)
            {
                convo.queued.push(QueuedItem {
                    item: mention.item,
                    quantity: mention.quantity,
                    preselected: mention.preselected,
                });
            } else {
                let mut cart_item = CartItem::from_menu_item(&mention.item, mention.quantity);
                cart_item.selections = mention.preselected;
                added.push(format!("{}x {}", cart_item.quantity, cart_item.name));
                convo.cart.push(cart_item);
            }
        }

        for (_, group) in outcome.ambiguities {
            merge_group(convo, group);
        }

        if added.is_empty() {
            None
        } else {
            Some(format!("Adicionei ao pedido: {}.", added.join(", ")))
        }
    }

    fn resolve_ambiguity(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        let Some((key, group)) = convo.ambiguities.iter().next().map(|(k, g)| (k.clone(), g.clone()))
        else {
            return Step::Continue(vec![self.advance(convo, None)]);
        };

        let picked: Option<MenuItem> = match input.structured_id() {
            Some(id) => id.strip_prefix("amb:").and_then(|item_id| {
                group.candidates.iter().find(|item| item.id.0 == item_id).cloned()
            }),
            None => {
                let text = normalize(input.display_text());
                let by_number = text
                    .parse::<usize>()
                    .ok()
                    .or_else(|| number_word(&text).map(|n| n as usize))
                    .and_then(|n| group.candidates.get(n.checked_sub(1)?).cloned());
                by_number.or_else(|| {
                    let mut hits = group.candidates.iter().filter(|item| {
                        let name = normalize(&item.name);
                        name.contains(&text) || text.contains(&name)
                    });
                    let first = hits.next().cloned();
                    if hits.next().is_some() {
                        None
                    } else {
                        first
                    }
                })
            }
        };

        let Some(item) = picked else {
            return Step::Continue(vec![self.ambiguity_prompt(&group)]);
        };

        convo.ambiguities.remove(&key);
        let outcome = MatchOutcome {
            resolved: vec![crate::matcher::ResolvedMention {
                item,
                quantity: group.quantity,
                preselected: Vec::new(),
            }],
            ambiguities: Default::default(),
        };
        let lead_in = self.apply_match_outcome(convo, outcome);
        Step::Continue(vec![self.advance(convo, lead_in)])
    }

    async fn on_product_questions(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        let Some(mut session) = convo.pending.take() else {
            return Step::Continue(vec![self.advance(convo, None)]);
        };
        let Some(question) = session.current_question().cloned() else {
            return Step::Continue(vec![self.advance(convo, None)]);
        };

        // On multi-select free text the AI-assisted extraction leads and
        // the single-match keyword shortcut only fields what the
        // classifier could not.
        let answer_input = classify_answer_input(&question, input);
        let outcome = match answer_input {
            AnswerInput::Text(text) if question.kind == QuestionKind::MultiSelect => {
                match self.extract_answers(convo, &question, text).await {
                    Some(extracted) => session.apply(AnswerInput::Extracted(extracted)),
                    None => session.apply(AnswerInput::Text(text)),
                }
            }
            other => session.apply(other),
        };

        match outcome {
            StepOutcome::Ask(next) => {
                let prompt = self.question_prompt(&session, &next);
                convo.pending = Some(session);
                Step::Continue(vec![prompt])
            }
            StepOutcome::Reprompt { question, reason } => {
                let prompt = self.question_prompt(&session, &question);
                convo.pending = Some(session);
                Step::Continue(vec![OutboundMessage::text(reason), prompt])
            }
            StepOutcome::Complete(cart_item) => {
                convo.pending = None;
                Step::Continue(vec![self.finish_item(convo, cart_item)])
            }
        }
    }

    /// A fully-customized item lands in the cart, unless the customer has
    /// not said how many yet: then the quantity question runs first.
    fn finish_item(&self, convo: &mut Conversation, cart_item: CartItem) -> OutboundMessage {
        if cart_item.quantity == 0 {
            let name = cart_item.name.clone();
            convo.awaiting_quantity = Some(cart_item);
            convo.transition(FlowState::ProductQuantity);
            return self.quantity_prompt(&name);
        }
        let lead_in = format!("Adicionei ao pedido: {}x {}.", cart_item.quantity, cart_item.name);
        convo.cart.push(cart_item);
        self.advance(convo, Some(lead_in))
    }

    async fn extract_answers(
        &self,
        convo: &Conversation,
        question: &Question,
        text: &str,
    ) -> Option<Vec<(crate::catalog::AnswerId, u32)>> {
        let now = Local::now();
        let store_open = self.store.is_open(now.weekday(), now.time());
        let response = self.classifier.classify(convo, &self.catalog, text, store_open).await;

        let mut extracted = Vec::new();
        for item in &response.items {
            for named in std::iter::once(&item.name).chain(item.answers.iter()) {
                let needle = normalize(named);
                if needle.is_empty() {
                    continue;
                }
                let mut hits = question.answers.iter().filter(|answer| {
                    let name = normalize(&answer.name);
                    name.contains(&needle) || needle.contains(&name)
                });
                if let Some(answer) = hits.next() {
                    if hits.next().is_none() {
                        extracted.push((answer.id.clone(), item.quantity.max(1)));
                    }
                }
            }
        }

        if extracted.is_empty() {
            None
        } else {
            Some(extracted)
        }
    }

    fn on_product_quantity(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        let Some(mut item) = convo.awaiting_quantity.take() else {
            return Step::Continue(vec![self.advance(convo, None)]);
        };

        let quantity = match input.structured_id() {
            Some(id) => id.strip_prefix("qty:").and_then(|raw| raw.parse::<u32>().ok()),
            None => parse_quantity(input.display_text()),
        };

        let Some(quantity) = quantity.filter(|q| *q >= 1) else {
            let name = item.name.clone();
            convo.awaiting_quantity = Some(item);
            return Step::Continue(vec![self.quantity_prompt(&name)]);
        };

        item.quantity = quantity;
        Step::Continue(vec![self.finish_item(convo, item)])
    }

    fn on_order_summary(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        match input.structured_id() {
            Some("order_confirm") => {
                convo.transition(FlowState::PaymentSelection);
                Step::Continue(vec![payment_prompt()])
            }
            Some("order_more") => {
                convo.transition(FlowState::Categories);
                Step::Continue(vec![self.categories_list("O que mais você gostaria?")])
            }
            Some("order_cancel") => Step::Finish(vec![
                SideEffect::Reply(OutboundMessage::text(
                    "Pedido cancelado. Quando quiser pedir de novo, é só mandar uma mensagem!",
                )),
                SideEffect::DeleteConversation,
            ]),
            _ => {
                let text = normalize(input.display_text());
                if text.contains("confirm") || text == "sim" {
                    convo.transition(FlowState::PaymentSelection);
                    Step::Continue(vec![payment_prompt()])
                } else if text.contains("cancel") {
                    Step::Finish(vec![
                        SideEffect::Reply(OutboundMessage::text(
                            "Pedido cancelado. Quando quiser pedir de novo, é só mandar uma mensagem!",
                        )),
                        SideEffect::DeleteConversation,
                    ])
                } else {
                    self.enter_summary(convo)
                }
            }
        }
    }

    fn on_payment_selection(&self, convo: &mut Conversation, input: &TurnInput) -> Step {
        let method = match input.structured_id() {
            Some("pay_cash") => Some(PaymentMethod::Cash),
            Some("pay_card") => Some(PaymentMethod::Card),
            Some("pay_pix") => Some(PaymentMethod::Pix),
            _ => {
                let text = normalize(input.display_text());
                if text.contains("dinheiro") {
                    Some(PaymentMethod::Cash)
                } else if text.contains("cartao") {
                    Some(PaymentMethod::Card)
                } else if text.contains("pix") {
                    Some(PaymentMethod::Pix)
                } else {
                    None
                }
            }
        };

        let Some(method) = method else {
            return Step::Continue(vec![payment_prompt()]);
        };

        convo.payment = Some(method);
        let delivery = convo.delivery.unwrap_or(DeliveryKind::Pickup);
        let totals = order_totals(&convo.cart, delivery, self.store.delivery_fee);
        let draft = OrderDraft::from_conversation(convo, method, &totals);

        let destination = match (delivery, convo.address.as_ref()) {
            (DeliveryKind::Delivery, Some(address)) => {
                format!("Entrega em: {}", address.formatted)
            }
            _ => "Retirada na loja".to_owned(),
        };
        let body = format!(
            "Pedido confirmado! 🎉\n{}\n{}\nPagamento: {}\nJá estamos preparando. Obrigado!",
            render_summary(&convo.cart, &totals),
            destination,
            method.label(),
        );

        tracing::info!(
            event_name = "order_confirmed",
            phone = %convo.phone.0,
            items = convo.cart.len(),
            total = %totals.total,
        );

        Step::Finish(vec![
            SideEffect::CreateOrder(draft),
            SideEffect::Reply(OutboundMessage::text(body)),
            SideEffect::NotifyOperator {
                detail: format!(
                    "novo pedido: {} itens, total R$ {} ({})",
                    convo.cart.len(),
                    format_price(totals.total),
                    method.label(),
                ),
            },
            SideEffect::DeleteConversation,
        ])
    }

    /// Picks the next thing to ask the customer, in priority order:
    /// open ambiguities, the active question walk, the open quantity
    /// question, queued items, then the anything-else prompt.
    fn advance(&self, convo: &mut Conversation, lead_in: Option<String>) -> OutboundMessage {
        if let Some(group) = convo.ambiguities.values().next().cloned() {
            convo.transition(FlowState::Products);
            return prefix(lead_in, self.ambiguity_prompt(&group));
        }

        if let Some(session) = convo.pending.take() {
            if let Some(question) = session.current_question().cloned() {
                convo.transition(FlowState::ProductQuestions);
                let prompt = self.question_prompt(&session, &question);
                convo.pending = Some(session);
                return prefix(lead_in, prompt);
            }
            convo.pending = Some(session);
        }

        if let Some(name) = convo.awaiting_quantity.as_ref().map(|item| item.name.clone()) {
            convo.transition(FlowState::ProductQuantity);
            return prefix(lead_in, self.quantity_prompt(&name));
        }

        while !convo.queued.is_empty() {
            let entry = convo.queued.remove(0);
            let mut session =
                CustomizationSession::new(entry.item, entry.quantity, entry.preselected);
            match session.first_prompt() {
                StepOutcome::Ask(question) | StepOutcome::Reprompt { question, .. } => {
                    let prompt = self.question_prompt(&session, &question);
                    convo.pending = Some(session);
                    convo.transition(FlowState::ProductQuestions);
                    return prefix(lead_in, prompt);
                }
                StepOutcome::Complete(cart_item) => {
                    if cart_item.quantity == 0 {
                        let name = cart_item.name.clone();
                        convo.awaiting_quantity = Some(cart_item);
                        convo.transition(FlowState::ProductQuantity);
                        return prefix(lead_in, self.quantity_prompt(&name));
                    }
                    convo.cart.push(cart_item);
                }
            }
        }

        if !convo.cart.is_empty() {
            convo.transition(FlowState::Products);
            return prefix(
                lead_in,
                OutboundMessage::Buttons {
                    body: "Deseja mais alguma coisa?".to_owned(),
                    buttons: vec![
                        Choice { id: "order_more".to_owned(), title: "Adicionar mais".to_owned() },
                        Choice {
                            id: "order_finish".to_owned(),
                            title: "Finalizar pedido".to_owned(),
                        },
                    ],
                },
            );
        }

        convo.transition(FlowState::Categories);
        prefix(lead_in, self.categories_list("O que você gostaria de pedir?"))
    }

    fn enter_summary(&self, convo: &mut Conversation) -> Step {
        if convo.cart.is_empty() {
            convo.transition(FlowState::Categories);
            return Step::Continue(vec![
                self.categories_list("Seu pedido está vazio. O que você gostaria de pedir?")
            ]);
        }

        let delivery = convo.delivery.unwrap_or(DeliveryKind::Pickup);
        let totals = order_totals(&convo.cart, delivery, self.store.delivery_fee);
        convo.transition(FlowState::OrderSummary);
        Step::Continue(vec![OutboundMessage::Buttons {
            body: format!("{}\n\nPosso confirmar?", render_summary(&convo.cart, &totals)),
            buttons: vec![
                Choice { id: "order_confirm".to_owned(), title: "Confirmar".to_owned() },
                Choice { id: "order_more".to_owned(), title: "Adicionar mais".to_owned() },
                Choice { id: "order_cancel".to_owned(), title: "Cancelar".to_owned() },
            ],
        }])
    }

    fn categories_list(&self, body: &str) -> OutboundMessage {
        let rows = self
            .catalog
            .categories
            .iter()
            .map(|category| Row {
                id: format!("cat:{}", category.id.0),
                title: category.name.clone(),
                description: None,
            })
            .collect();
        OutboundMessage::List {
            body: body.to_owned(),
            button_label: "Ver cardápio".to_owned(),
            rows,
        }
    }

    fn products_list(&self, category: &crate::catalog::Category) -> OutboundMessage {
        let day = Local::now().weekday();
        let rows = category
            .items
            .iter()
            .filter(|item| item.available_on.allows(day))
            .map(|item| Row {
                id: format!("item:{}", item.id.0),
                title: item.name.clone(),
                description: Some(format!("R$ {}", format_price(item.base_price))),
            })
            .collect();
        OutboundMessage::List {
            body: format!("Essas são as opções de {}:", category.name),
            button_label: "Ver opções".to_owned(),
            rows,
        }
    }

    fn ambiguity_prompt(&self, group: &AmbiguityGroup) -> OutboundMessage {
        let rows = group
            .candidates
            .iter()
            .map(|item| Row {
                id: format!("amb:{}", item.id.0),
                title: item.name.clone(),
                description: Some(format!("R$ {}", format_price(item.base_price))),
            })
            .collect();
        OutboundMessage::List {
            body: format!("Temos mais de uma opção para \"{}\". Qual você prefere?", group.literal),
            button_label: "Ver opções".to_owned(),
            rows,
        }
    }

    fn question_prompt(
        &self,
        session: &CustomizationSession,
        question: &Question,
    ) -> OutboundMessage {
        let mut rows: Vec<Row> = question
            .answers
            .iter()
            .map(|answer| Row {
                id: format!("ans:{}", answer.id.0),
                title: answer.name.clone(),
                description: answer
                    .surcharge
                    .filter(|s| *s > Decimal::ZERO)
                    .map(|s| format!("+R$ {}", format_price(s))),
            })
            .collect();
        if question.kind == QuestionKind::MultiSelect {
            rows.push(Row {
                id: "done".to_owned(),
                title: "Pronto, é só isso".to_owned(),
                description: None,
            });
        }
        if question.min_required == 0 {
            rows.push(Row { id: "skip".to_owned(), title: "Pular".to_owned(), description: None });
        }
        OutboundMessage::List {
            body: format!("{} — {}", session.item.name, question.name),
            button_label: "Ver opções".to_owned(),
            rows,
        }
    }

    fn quantity_prompt(&self, item_name: &str) -> OutboundMessage {
        OutboundMessage::List {
            body: format!("Quantos {item_name} você quer?"),
            button_label: "Quantidade".to_owned(),
            rows: (1..=5u32)
                .map(|n| Row { id: format!("qty:{n}"), title: n.to_string(), description: None })
                .collect(),
        }
    }
}

fn payment_prompt() -> OutboundMessage {
    OutboundMessage::Buttons {
        body: "Como você prefere pagar?".to_owned(),
        buttons: vec![
            Choice { id: "pay_cash".to_owned(), title: "Dinheiro".to_owned() },
            Choice { id: "pay_card".to_owned(), title: "Cartão".to_owned() },
            Choice { id: "pay_pix".to_owned(), title: "Pix".to_owned() },
        ],
    }
}

fn classify_answer_input<'a>(question: &Question, input: &'a TurnInput) -> AnswerInput<'a> {
    if let Some(id) = input.structured_id() {
        if id == "done" {
            return AnswerInput::Done;
        }
        if id == "skip" {
            return AnswerInput::Skip;
        }
        if let Some(answer_id) = id.strip_prefix("ans:") {
            if let Some(answer) = question.answer(&crate::catalog::AnswerId(answer_id.to_owned())) {
                return AnswerInput::Answer { answer_id: answer.id.clone(), quantity: 1 };
            }
        }
    }

    let text = input.display_text();
    let normalized = normalize(text);
    if DONE_KEYWORDS.contains(&normalized.as_str()) {
        return AnswerInput::Done;
    }
    if SKIP_KEYWORDS.contains(&normalized.as_str()) {
        return AnswerInput::Skip;
    }
    AnswerInput::Text(text)
}

fn parse_quantity(text: &str) -> Option<u32> {
    let normalized = normalize(text);
    let token = normalized.split_whitespace().next()?;
    token.parse::<u32>().ok().or_else(|| number_word(token))
}

fn merge_group(convo: &mut Conversation, group: AmbiguityGroup) {
    convo
        .ambiguities
        .entry(group.phrase_key.clone())
        .and_modify(|existing| existing.quantity += group.quantity)
        .or_insert(group);
}

fn prefix(lead_in: Option<String>, message: OutboundMessage) -> OutboundMessage {
    let Some(lead_in) = lead_in else {
        return message;
    };
    match message {
        OutboundMessage::Text { body } => {
            OutboundMessage::Text { body: format!("{lead_in}\n{body}") }
        }
        OutboundMessage::Buttons { body, buttons } => {
            OutboundMessage::Buttons { body: format!("{lead_in}\n{body}"), buttons }
        }
        OutboundMessage::List { body, button_label, rows } => {
            OutboundMessage::List { body: format!("{lead_in}\n{body}"), button_label, rows }
        }
    }
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::NaiveTime;
    use rust_decimal::Decimal;

    use crate::address_pipeline::AddressResolutionPipeline;
    use crate::catalog::{
        Answer, AnswerId, Catalog, Category, CategoryId, MenuItem, MenuItemId, Question,
        QuestionId, QuestionKind, WeekdayAvailability,
    };
    use crate::config::{AppConfig, StoreConfig};
    use crate::customization::CustomizationSession;
    use crate::domain::address::{AddressComponents, PlaceCandidate, PlaceId, ResolvedAddress};
    use crate::domain::conversation::{Conversation, DeliveryKind, HistoryRole, PhoneNumber};
    use crate::errors::ApplicationError;
    use crate::flows::states::{FlowState, OutboundMessage, SideEffect, TurnInput};
    use crate::intent::{IntentAction, IntentItem, IntentResponse};
    use crate::ports::{GeocodeBias, GeocodeClient, IntentClassifier};

    use super::ConversationEngine;

    struct FakeClassifier {
        response: IntentResponse,
    }

    #[async_trait]
    impl IntentClassifier for FakeClassifier {
        async fn classify(
            &self,
            _conversation: &Conversation,
            _catalog: &Catalog,
            _message: &str,
            _store_open: bool,
        ) -> IntentResponse {
            self.response.clone()
        }
    }

    struct FakeGeocoder {
        latitude: f64,
        longitude: f64,
    }

    #[async_trait]
    impl GeocodeClient for FakeGeocoder {
        async fn autocomplete(
            &self,
            _input: &str,
            _bias: &GeocodeBias,
        ) -> Result<Vec<PlaceCandidate>, ApplicationError> {
            Ok(vec![PlaceCandidate {
                place_id: PlaceId("p1".to_owned()),
                main_text: "Rua Augusta, 100".to_owned(),
                secondary_text: "São Paulo - SP".to_owned(),
            }])
        }

        async fn place_details(
            &self,
            place_id: &PlaceId,
        ) -> Result<ResolvedAddress, ApplicationError> {
            Ok(ResolvedAddress {
                place_id: place_id.clone(),
                latitude: self.latitude,
                longitude: self.longitude,
                formatted: "Rua Augusta, 100 - São Paulo".to_owned(),
                components: AddressComponents::default(),
            })
        }
    }

    fn catalog() -> Catalog {
        let carne = Question {
            id: QuestionId("carne".to_owned()),
            name: "Escolha a carne".to_owned(),
            kind: QuestionKind::SingleSelect,
            min_required: 1,
            max_allowed: 1,
            answers: vec![
                Answer {
                    id: AnswerId("bife".to_owned()),
                    name: "Bife Acebolado".to_owned(),
                    surcharge: Some(Decimal::new(300, 2)),
                    max_quantity: None,
                },
                Answer {
                    id: AnswerId("file".to_owned()),
                    name: "Filé de Frango".to_owned(),
                    surcharge: None,
                    max_quantity: None,
                },
            ],
        };
        Catalog::new(vec![
            Category {
                id: CategoryId("marmitas".to_owned()),
                name: "Marmitas".to_owned(),
                items: vec![
                    MenuItem {
                        id: MenuItemId("marmitex".to_owned()),
                        name: "Marmitex".to_owned(),
                        description: None,
                        base_price: Decimal::new(2200, 2),
                        available_on: WeekdayAvailability::all_days(),
                        questions: vec![carne],
                    },
                    MenuItem {
                        id: MenuItemId("frango-grelhado".to_owned()),
                        name: "Frango Grelhado".to_owned(),
                        description: None,
                        base_price: Decimal::new(2500, 2),
                        available_on: WeekdayAvailability::all_days(),
                        questions: Vec::new(),
                    },
                    MenuItem {
                        id: MenuItemId("frango-parmegiana".to_owned()),
                        name: "Frango à Parmegiana".to_owned(),
                        description: None,
                        base_price: Decimal::new(2800, 2),
                        available_on: WeekdayAvailability::all_days(),
                        questions: Vec::new(),
                    },
                ],
            },
            Category {
                id: CategoryId("bebidas".to_owned()),
                name: "Bebidas".to_owned(),
                items: vec![MenuItem {
                    id: MenuItemId("guarana".to_owned()),
                    name: "Guaraná Lata".to_owned(),
                    description: None,
                    base_price: Decimal::new(600, 2),
                    available_on: WeekdayAvailability::all_days(),
                    questions: Vec::new(),
                }],
            },
        ])
    }

    fn store() -> StoreConfig {
        let mut store = AppConfig::default().store;
        store.id = "store-1".to_owned();
        store.name = "Marmitaria do Centro".to_owned();
        store.city = "São Paulo".to_owned();
        store.state = "SP".to_owned();
        store.latitude = -23.5505;
        store.longitude = -46.6333;
        store.delivery_max_radius_km = 10.0;
        store.delivery_fee = Decimal::new(500, 2);
        store.opens_at = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        store.closes_at = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        store
    }

    fn engine_with(geocoder: FakeGeocoder, response: IntentResponse) -> ConversationEngine {
        let store = store();
        let bias = GeocodeBias { city: store.city.clone(), state: store.state.clone() };
        let addresses = Arc::new(AddressResolutionPipeline::new(Arc::new(geocoder), bias));
        ConversationEngine::new(catalog(), store, Arc::new(FakeClassifier { response }), addresses)
    }

    fn engine() -> ConversationEngine {
        engine_with(
            FakeGeocoder { latitude: -23.5505, longitude: -46.6333 },
            IntentResponse::fallback_error(),
        )
    }

    fn conversation(flow: FlowState) -> Conversation {
        let mut convo = Conversation::new(PhoneNumber("5511999990000".to_owned()), "store-1");
        convo.flow = flow;
        convo.delivery = Some(DeliveryKind::Pickup);
        convo
    }

    fn text(message: &str) -> TurnInput {
        TurnInput::Text(message.to_owned())
    }

    #[tokio::test]
    async fn welcome_offers_delivery_or_pickup() {
        let outcome = engine()
            .handle_turn(conversation(FlowState::Welcome), text("oi"))
            .await
            .expect("turn");

        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.flow, FlowState::DeliveryType);
        assert!(matches!(
            outcome.effects.as_slice(),
            [SideEffect::Reply(OutboundMessage::Buttons { buttons, .. })] if buttons.len() == 2
        ));
    }

    #[tokio::test]
    async fn closed_store_sends_hours_and_ends_the_conversation() {
        let mut eng = engine();
        eng.store.open_days = WeekdayAvailability::only(&[]);

        let outcome =
            eng.handle_turn(conversation(FlowState::Welcome), text("oi")).await.expect("turn");

        assert!(outcome.conversation.is_none());
        assert!(outcome.effects.contains(&SideEffect::DeleteConversation));
        assert!(outcome
            .effects
            .iter()
            .any(|effect| matches!(effect, SideEffect::Reply(m) if m.body().contains("fechada"))));
    }

    #[tokio::test]
    async fn sentence_with_two_mentions_fills_cart_and_starts_questions() {
        let outcome = engine()
            .handle_turn(
                conversation(FlowState::Categories),
                text("quero uma marmitex e dois guaranás"),
            )
            .await
            .expect("turn");

        let convo = outcome.conversation.expect("conversation kept");
        // The drink has no questions and lands in the cart directly.
        assert_eq!(convo.cart.len(), 1);
        assert_eq!(convo.cart[0].name, "Guaraná Lata");
        assert_eq!(convo.cart[0].quantity, 2);
        // The marmitex waits on its meat question.
        assert_eq!(convo.flow, FlowState::ProductQuestions);
        assert!(convo.pending.is_some());
    }

    #[tokio::test]
    async fn list_pick_walks_questions_before_the_quantity() {
        let eng = engine();
        let outcome = eng
            .handle_turn(
                conversation(FlowState::Products),
                TurnInput::ListReply { id: "item:marmitex".to_owned(), title: "Marmitex".to_owned() },
            )
            .await
            .expect("turn");
        assert!(outcome.first_reply_body().expect("reply").contains("Escolha a carne"));
        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.flow, FlowState::ProductQuestions);

        let outcome = eng.handle_turn(convo, text("bife")).await.expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        // Customized but not quantified yet: nothing in the cart.
        assert_eq!(convo.flow, FlowState::ProductQuantity);
        assert!(convo.cart.is_empty());
        assert!(convo.awaiting_quantity.is_some());

        let outcome = eng.handle_turn(convo, text("2")).await.expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        assert!(convo.awaiting_quantity.is_none());
        assert_eq!(convo.cart.len(), 1);
        assert_eq!(convo.cart[0].quantity, 2);
        // 22.00 base + 3.00 surcharge.
        assert_eq!(convo.cart[0].unit_price(), Decimal::new(2500, 2));
    }

    #[tokio::test]
    async fn list_pick_without_questions_still_asks_the_quantity() {
        let eng = engine();
        let outcome = eng
            .handle_turn(
                conversation(FlowState::Products),
                TurnInput::ListReply { id: "item:guarana".to_owned(), title: "Guaraná Lata".to_owned() },
            )
            .await
            .expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.flow, FlowState::ProductQuantity);

        let outcome = eng
            .handle_turn(convo, TurnInput::ListReply { id: "qty:3".to_owned(), title: "3".to_owned() })
            .await
            .expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.cart.len(), 1);
        assert_eq!(convo.cart[0].quantity, 3);
        assert_eq!(convo.flow, FlowState::Products);
    }

    #[tokio::test]
    async fn ambiguous_mention_is_disambiguated_by_number() {
        let eng = engine();
        let outcome = eng
            .handle_turn(conversation(FlowState::Categories), text("quero um frango"))
            .await
            .expect("turn");

        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.ambiguities.len(), 1);
        assert!(matches!(
            outcome.effects.as_slice(),
            [SideEffect::Reply(OutboundMessage::List { rows, .. })] if rows.len() == 2
        ));

        let outcome = eng.handle_turn(convo, text("1")).await.expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        assert!(convo.ambiguities.is_empty());
        assert_eq!(convo.cart.len(), 1);
    }

    #[tokio::test]
    async fn answering_the_question_walk_completes_the_item() {
        let eng = engine();
        let outcome = eng
            .handle_turn(conversation(FlowState::Categories), text("quero uma marmitex"))
            .await
            .expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.flow, FlowState::ProductQuestions);

        let outcome = eng.handle_turn(convo, text("bife")).await.expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        assert!(convo.pending.is_none());
        assert_eq!(convo.cart.len(), 1);
        // 22.00 base + 3.00 surcharge.
        assert_eq!(convo.cart[0].unit_price(), Decimal::new(2500, 2));
    }

    #[tokio::test]
    async fn address_outside_radius_returns_to_address_collection() {
        // Roughly 12 km north of the store, past the 10 km radius.
        let eng = engine_with(
            FakeGeocoder { latitude: -23.4425, longitude: -46.6333 },
            IntentResponse::fallback_error(),
        );

        let mut convo = conversation(FlowState::AddressConfirmation);
        convo.delivery = Some(DeliveryKind::Delivery);
        convo.address_candidates = vec![PlaceCandidate {
            place_id: PlaceId("p1".to_owned()),
            main_text: "Rua Augusta, 100".to_owned(),
            secondary_text: "São Paulo - SP".to_owned(),
        }];

        let outcome = eng
            .handle_turn(convo, TurnInput::ButtonReply { id: "address_yes".to_owned(), title: "Sim".to_owned() })
            .await
            .expect("turn");

        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.flow, FlowState::NewAddress);
        assert!(convo.address.is_none());
        assert!(outcome
            .effects
            .iter()
            .any(|effect| matches!(effect, SideEffect::Reply(m) if m.body().contains("km"))));
    }

    #[tokio::test]
    async fn address_inside_radius_moves_to_the_menu() {
        let eng = engine();
        let mut convo = conversation(FlowState::AddressConfirmation);
        convo.delivery = Some(DeliveryKind::Delivery);
        convo.address_candidates = vec![PlaceCandidate {
            place_id: PlaceId("p1".to_owned()),
            main_text: "Rua Augusta, 100".to_owned(),
            secondary_text: "São Paulo - SP".to_owned(),
        }];

        let outcome = eng
            .handle_turn(convo, TurnInput::ButtonReply { id: "address_yes".to_owned(), title: "Sim".to_owned() })
            .await
            .expect("turn");

        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.flow, FlowState::Categories);
        assert!(convo.address.is_some());
    }

    #[tokio::test]
    async fn extraction_outranks_the_keyword_shortcut_on_multi_select() {
        let adicionais = Question {
            id: QuestionId("adicionais".to_owned()),
            name: "Adicionais".to_owned(),
            kind: QuestionKind::MultiSelect,
            min_required: 1,
            max_allowed: 3,
            answers: vec![
                Answer {
                    id: AnswerId("parmesao".to_owned()),
                    name: "Parmesão".to_owned(),
                    surcharge: Some(Decimal::new(400, 2)),
                    max_quantity: None,
                },
                Answer {
                    id: AnswerId("ovo".to_owned()),
                    name: "Ovo frito".to_owned(),
                    surcharge: Some(Decimal::new(250, 2)),
                    max_quantity: None,
                },
            ],
        };
        let item = MenuItem {
            id: MenuItemId("marmitex-g".to_owned()),
            name: "Marmitex Grande".to_owned(),
            description: None,
            base_price: Decimal::new(2600, 2),
            available_on: WeekdayAvailability::all_days(),
            questions: vec![adicionais],
        };

        // The classifier reads both additions out of the sentence; the
        // keyword shortcut alone would have caught only one.
        let eng = engine_with(
            FakeGeocoder { latitude: -23.5505, longitude: -46.6333 },
            IntentResponse {
                action: IntentAction::Ordering,
                message: String::new(),
                items: vec![IntentItem {
                    name: "parmesao".to_owned(),
                    quantity: 1,
                    answers: vec!["ovo frito".to_owned()],
                }],
                address: None,
            },
        );

        let mut convo = conversation(FlowState::ProductQuestions);
        let mut session = CustomizationSession::new(item, 1, Vec::new());
        session.first_prompt();
        convo.pending = Some(session);

        let outcome =
            eng.handle_turn(convo, text("pode por parmesao e ovo frito")).await.expect("turn");
        let convo = outcome.conversation.expect("conversation kept");
        assert_eq!(convo.cart.len(), 1);
        assert_eq!(convo.cart[0].selections[0].answers.len(), 2);
    }

    #[tokio::test]
    async fn multi_message_turns_record_every_assistant_message() {
        let eng = engine();
        let mut convo = conversation(FlowState::AddressConfirmation);
        convo.delivery = Some(DeliveryKind::Delivery);
        convo.address_candidates = vec![PlaceCandidate {
            place_id: PlaceId("p1".to_owned()),
            main_text: "Rua Augusta, 100".to_owned(),
            secondary_text: "São Paulo - SP".to_owned(),
        }];

        let outcome = eng
            .handle_turn(convo, TurnInput::ButtonReply { id: "address_yes".to_owned(), title: "Sim".to_owned() })
            .await
            .expect("turn");

        let convo = outcome.conversation.expect("conversation kept");
        let assistant: Vec<&str> = convo
            .history
            .iter()
            .filter(|turn| turn.role == HistoryRole::Assistant)
            .map(|turn| turn.text.as_str())
            .collect();
        assert_eq!(assistant.len(), 2);
        assert!(assistant[0].contains("Endereço confirmado"));
        assert!(assistant[1].contains("O que você gostaria"));
    }

    #[tokio::test]
    async fn payment_choice_creates_the_order_and_deletes_the_conversation() {
        let eng = engine();
        let mut convo = conversation(FlowState::PaymentSelection);
        convo.cart.push(crate::domain::cart::CartItem::from_menu_item(
            eng.catalog.find_item(&MenuItemId("guarana".to_owned())).expect("item"),
            2,
        ));

        let outcome = eng
            .handle_turn(convo, TurnInput::ButtonReply { id: "pay_pix".to_owned(), title: "Pix".to_owned() })
            .await
            .expect("turn");

        assert!(outcome.conversation.is_none());
        assert!(outcome
            .effects
            .iter()
            .any(|effect| matches!(effect, SideEffect::CreateOrder(draft) if draft.total == Decimal::new(1200, 2))));
        assert!(outcome
            .effects
            .iter()
            .any(|effect| matches!(effect, SideEffect::NotifyOperator { detail } if detail.contains("novo pedido"))));
        assert!(outcome.effects.contains(&SideEffect::DeleteConversation));
    }

    #[tokio::test]
    async fn legacy_flow_state_fails_the_turn() {
        let result = engine().handle_turn(conversation(FlowState::Legacy), text("oi")).await;
        assert!(result.is_err());
    }
}
