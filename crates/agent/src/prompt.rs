//! Prompt assembly for the intent classifier. The system prompt pins the
//! JSON contract and the attendant's conversational rules; the user
//! context carries the menu, the history and the new message.

use chrono::{Datelike, Local};

use comanda_core::catalog::Catalog;
use comanda_core::config::StoreConfig;
use comanda_core::domain::conversation::Conversation;

pub fn system_prompt(store: &StoreConfig) -> String {
    format!(
        r#"Você é o atendente virtual da {name}, em {city} - {state}.

Responda SEMPRE com um único objeto JSON, sem texto fora dele, no formato:
{{"action": "...", "mensagem": "...", "items": [...], "endereco": null}}

Valores possíveis para "action":
- "Saudacao": cumprimento ou conversa que não pede nada do cardápio.
- "Fazendo Pedido": o cliente citou itens do cardápio. Preencha "items"
  com objetos {{"name": "...", "quantity": N, "answers": ["..."]}} usando
  os nomes exatos do cardápio e as opções que o cliente já citou.
- "Pedido Finalizado": o cliente indicou que não quer mais nada.
- "Forma de Pagamento": o cliente falou sobre como vai pagar.
- "error": a mensagem não pôde ser entendida.

Regras de atendimento:
- Faça UMA pergunta por vez, nunca duas na mesma mensagem.
- Ao citar opções com acréscimo, informe o valor (ex.: "+R$ 3,00").
- NUNCA pergunte o endereço do cliente; outra parte do sistema cuida disso.
- Toda resposta que não encerra o pedido termina com uma pergunta.
- Ofereça apenas itens que constam no cardápio enviado.
- "mensagem" é o texto que o cliente vai ler, em português, curto e cordial."#,
        name = store.name,
        city = store.city,
        state = store.state,
    )
}

pub fn user_context(
    conversation: &Conversation,
    catalog: &Catalog,
    message: &str,
    store_open: bool,
) -> String {
    let day = Local::now().weekday();
    let status = if store_open { "aberta" } else { "fechada" };
    let history = conversation.history_for_prompt();
    let history_block =
        if history.is_empty() { String::from("(sem mensagens anteriores)") } else { history };

    format!(
        "Cardápio de hoje:\n{menu}\n\nA loja está {status}.\n\nConversa até agora:\n{history_block}\n\nNova mensagem do cliente:\n{message}",
        menu = catalog.serialize_for_prompt(day),
    )
}

#[cfg(test)]
mod tests {
    use comanda_core::config::AppConfig;
    use comanda_core::domain::conversation::{Conversation, PhoneNumber};
    use comanda_core::Catalog;

    use super::{system_prompt, user_context};

    #[test]
    fn system_prompt_names_the_store_and_the_contract() {
        let mut store = AppConfig::default().store;
        store.name = "Marmitaria do Centro".to_owned();
        store.city = "São Paulo".to_owned();
        store.state = "SP".to_owned();

        let prompt = system_prompt(&store);
        assert!(prompt.contains("Marmitaria do Centro"));
        assert!(prompt.contains("\"Fazendo Pedido\""));
        assert!(prompt.contains("NUNCA pergunte o endereço"));
    }

    #[test]
    fn user_context_carries_history_and_new_message() {
        let mut convo = Conversation::new(PhoneNumber("5511999990000".to_owned()), "store-1");
        convo.record_customer("oi");
        convo.record_assistant("Olá! O que você gostaria?");

        let context = user_context(&convo, &Catalog::default(), "quero uma marmita", true);
        assert!(context.contains("Cliente: oi"));
        assert!(context.contains("quero uma marmita"));
        assert!(context.contains("aberta"));
    }
}
