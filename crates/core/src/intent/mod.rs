pub mod parser;

use serde::{Deserialize, Serialize};

pub use parser::{parse_intent, try_parse_intent, IntentParseError};

/// Fixed customer-facing fallback used whenever the classifier response is
/// unusable. The conversation restarts the exchange instead of getting
/// stuck.
pub const FALLBACK_ERROR_MESSAGE: &str =
    "Desculpe, não consegui entender. Vamos recomeçar: o que você gostaria de pedir?";

/// Action vocabulary of the classifier contract. Wire values are the
/// Portuguese strings the model is instructed to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentAction {
    #[serde(rename = "Saudacao", alias = "Saudação")]
    Greeting,
    #[serde(rename = "Fazendo Pedido")]
    Ordering,
    #[serde(rename = "Pedido Finalizado")]
    OrderFinished,
    #[serde(rename = "Forma de Pagamento")]
    PaymentMethod,
    #[serde(rename = "error", alias = "erro")]
    Error,
}

/// An item the classifier extracted from the customer message, possibly
/// carrying customization answers named in the same sentence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentItem {
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(default = "default_quantity", alias = "quantidade")]
    pub quantity: u32,
    #[serde(default, alias = "respostas", alias = "opcoes")]
    pub answers: Vec<String>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub action: IntentAction,
    #[serde(rename = "mensagem", alias = "message")]
    pub message: String,
    #[serde(default)]
    pub items: Vec<IntentItem>,
    #[serde(default, rename = "endereco", alias = "address")]
    pub address: Option<String>,
}

impl IntentResponse {
    /// The safe degradation target for any unusable classifier output.
    pub fn fallback_error() -> Self {
        Self {
            action: IntentAction::Error,
            message: FALLBACK_ERROR_MESSAGE.to_owned(),
            items: Vec::new(),
            address: None,
        }
    }
}
