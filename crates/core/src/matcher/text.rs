//! Text normalization shared by both matching strategies.

/// Size/variant words stripped when deriving a comparable base name, for
/// both catalog items and customer phrases.
const VARIANT_STOPWORDS: &[&str] = &[
    "lata", "latinha", "garrafa", "copo", "grande", "medio", "media", "pequeno", "pequena",
    "litro", "ml", "2l", "1l", "600ml",
];

/// Request filler words dropped from a mention before matching.
const FILLER_WORDS: &[&str] = &[
    "quero", "queria", "gostaria", "vou", "me", "ve", "traz", "manda", "pedir", "por", "favor",
    "de", "da", "do", "o", "a", "mais",
];

pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.to_lowercase().chars() {
        let mapped = strip_diacritic(ch);
        if mapped.is_alphanumeric() {
            out.push(mapped);
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Normalized name with size/variant words removed; the comparable "base
/// name" used on both sides of the fuzzy search.
pub fn base_name(name: &str) -> String {
    normalize(name)
        .split_whitespace()
        .filter(|token| !VARIANT_STOPWORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits a message on explicit conjunctions (" e ", commas) into
/// candidate product mentions.
pub fn split_mentions(text: &str) -> Vec<String> {
    text.replace(" e ", ",")
        .split(',')
        .map(str::trim)
        .filter(|mention| !mention.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Portuguese quantity words one through ten.
pub fn number_word(token: &str) -> Option<u32> {
    match token {
        "um" | "uma" => Some(1),
        "dois" | "duas" => Some(2),
        "tres" => Some(3),
        "quatro" => Some(4),
        "cinco" => Some(5),
        "seis" => Some(6),
        "sete" => Some(7),
        "oito" => Some(8),
        "nove" => Some(9),
        "dez" => Some(10),
        _ => None,
    }
}

/// Extracts the leading quantity (digit or number word, defaulting to 1)
/// and the remaining phrase with filler words removed.
pub fn parse_mention(mention: &str) -> (u32, String) {
    let normalized = normalize(mention);
    let mut quantity = None;
    let mut phrase_tokens = Vec::new();

    for token in normalized.split_whitespace() {
        if quantity.is_none() {
            if let Ok(digits) = token.parse::<u32>() {
                quantity = Some(digits.max(1));
                continue;
            }
            if let Some(word) = number_word(token) {
                quantity = Some(word);
                continue;
            }
        }
        if FILLER_WORDS.contains(&token) {
            continue;
        }
        phrase_tokens.push(token);
    }

    let phrase = phrase_tokens
        .into_iter()
        .filter(|token| !VARIANT_STOPWORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ");
    (quantity.unwrap_or(1), phrase)
}
