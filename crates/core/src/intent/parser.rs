//! Repair parser for classifier responses.
//!
//! The language model is supposed to answer with a single JSON object, but
//! in practice wraps it in markdown fences, uses single quotes, or leaves
//! raw newlines inside the message value. This module is the one place
//! that turns that raw text into a usable `IntentResponse`; it never
//! panics and never returns a raw error to the conversation.

use regex::Regex;
use thiserror::Error;

use crate::intent::{IntentAction, IntentResponse};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("mandatory field `{0}` is missing")]
    MissingField(&'static str),
}

/// Strict parse: all repair steps, but structural failures are reported.
/// Used directly by tests; production code goes through [`parse_intent`].
pub fn try_parse_intent(raw: &str) -> Result<IntentResponse, IntentParseError> {
    let unfenced = strip_code_fences(raw);
    let object = extract_json_object(&unfenced).ok_or(IntentParseError::NoJsonObject)?;
    let object = normalize_quotes(&object);
    let object = escape_message_control_chars(&object);

    let value: serde_json::Value = serde_json::from_str(&object)
        .map_err(|error| IntentParseError::InvalidJson(error.to_string()))?;

    if value.get("action").and_then(|v| v.as_str()).is_none() {
        return Err(IntentParseError::MissingField("action"));
    }
    let has_message = value.get("mensagem").and_then(|v| v.as_str()).is_some()
        || value.get("message").and_then(|v| v.as_str()).is_some();
    if !has_message {
        return Err(IntentParseError::MissingField("mensagem"));
    }

    serde_json::from_value(value).map_err(|error| IntentParseError::InvalidJson(error.to_string()))
}

/// Total parse: degrades through the regex fallback down to the fixed
/// `error` action. The caller can always use the result.
pub fn parse_intent(raw: &str) -> IntentResponse {
    match try_parse_intent(raw) {
        Ok(response) => response,
        Err(_) => regex_fallback(raw).unwrap_or_else(IntentResponse::fallback_error),
    }
}

fn strip_code_fences(raw: &str) -> String {
    let fence = Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid fence pattern");
    match fence.captures(raw) {
        Some(captures) => captures[1].to_string(),
        None => raw.to_string(),
    }
}

/// First top-level `{...}` block, found with a balanced-brace scan that is
/// aware of string literals.
fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Models occasionally emit the whole object with single quotes. Only
/// convert when single quotes are used exclusively, so apostrophes inside
/// proper double-quoted strings are left alone.
fn normalize_quotes(object: &str) -> String {
    if object.contains('\'') && !object.contains('"') {
        object.replace('\'', "\"")
    } else {
        object.to_string()
    }
}

/// Raw newline/carriage-return/tab characters inside the value of the
/// message field are the most common malformed-JSON case. Locate the
/// `"mensagem": "..."` span and re-escape control characters within it
/// only.
fn escape_message_control_chars(object: &str) -> String {
    let field = Regex::new(r#""(?:mensagem|message)"\s*:\s*""#).expect("valid field pattern");
    let Some(found) = field.find(object) else {
        return object.to_string();
    };

    let value_start = found.end();
    let bytes = object.as_bytes();
    let mut value_end = None;
    let mut escaped = false;
    for index in value_start..bytes.len() {
        let byte = bytes[index];
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == b'"' {
            value_end = Some(index);
            break;
        }
    }
    let Some(value_end) = value_end else {
        return object.to_string();
    };

    let repaired = object[value_start..value_end]
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");

    format!("{}{}{}", &object[..value_start], repaired, &object[value_end..])
}

/// Last resort: independent regex captures for the action and message. If
/// both succeed a minimal response is synthesized; otherwise the caller
/// falls back to the fixed error action.
fn regex_fallback(raw: &str) -> Option<IntentResponse> {
    let action_re =
        Regex::new(r#"["']?action["']?\s*[:=]\s*["']([^"']+)["']"#).expect("valid action pattern");
    let message_re = Regex::new(r#"["']?(?:mensagem|message)["']?\s*[:=]\s*["']([^"']+)["']"#)
        .expect("valid message pattern");

    let action = action_from_wire(action_re.captures(raw)?.get(1)?.as_str())?;
    let message = message_re.captures(raw)?.get(1)?.as_str().trim().to_string();
    if message.is_empty() {
        return None;
    }

    Some(IntentResponse { action, message, items: Vec::new(), address: None })
}

fn action_from_wire(wire: &str) -> Option<IntentAction> {
    match wire.trim() {
        "Saudacao" | "Saudação" => Some(IntentAction::Greeting),
        "Fazendo Pedido" => Some(IntentAction::Ordering),
        "Pedido Finalizado" => Some(IntentAction::OrderFinished),
        "Forma de Pagamento" => Some(IntentAction::PaymentMethod),
        "error" | "erro" => Some(IntentAction::Error),
        _ => None,
    }
}
