//! Maps model reply keys onto the canonical result schema.
//!
//! Keys are lowercased and each whitespace character becomes `_`; nothing
//! else is rewritten, so `suggested-title` stays unknown. After that the
//! alias table fills canonical slots the reply left empty.

use prodlens_contracts::analysis::{
    CanonicalField, ListingField, LocalizedListing, MultilingualContent, ProductAnalysis,
    FEATURE_ALIASES,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};

/// A normalized result plus the canonical fields the reply did not carry.
/// Missing fields are a partial result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub missing: Vec<String>,
}

impl<T> Normalized<T> {
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }
}

pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| if ch.is_whitespace() { '_' } else { ch })
        .collect::<String>()
        .to_lowercase()
}

/// Normalizes every top-level key and resolves aliases. On key collisions
/// after normalization the later entry wins.
pub fn normalize_keys(raw: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in raw {
        out.insert(normalize_key(&key), value);
    }
    for (alias, canonical) in FEATURE_ALIASES {
        if out.contains_key(*canonical) {
            continue;
        }
        if let Some(value) = out.remove(*alias) {
            out.insert((*canonical).to_string(), value);
        }
    }
    out
}

pub fn normalize_product_analysis(
    payload: Value,
) -> AnalysisResult<Normalized<ProductAnalysis>> {
    let Value::Object(raw) = payload else {
        return Err(AnalysisError::malformed(
            "structured analysis must be a JSON object",
            &payload.to_string(),
        ));
    };

    let mut analysis = ProductAnalysis::default();
    let mut seen = Vec::new();
    for (key, value) in normalize_keys(raw) {
        let Some(field) = CanonicalField::from_key(&key) else {
            analysis.extra.insert(key, value);
            continue;
        };
        seen.push(field);
        if let Some(list) = analysis.list_mut(field) {
            *list = coerce_list(value);
        } else if let Some(slot) = analysis.text_mut(field) {
            *slot = coerce_text(value);
        } else if field == CanonicalField::ConfidenceScore {
            analysis.confidence_score = coerce_score(&value);
        }
    }

    let missing = CanonicalField::ALL
        .into_iter()
        .filter(|field| !seen.contains(field))
        .map(|field| field.as_str().to_string())
        .collect();
    Ok(Normalized {
        value: analysis,
        missing,
    })
}

/// Normalizes a multilingual reply. Outer language keys and each language's
/// inner keys go through the same key normalization. Only languages present
/// in the reply appear in the result; requested codes the model skipped are
/// reported as missing.
pub fn normalize_multilingual(
    payload: Value,
    requested: &[String],
) -> AnalysisResult<Normalized<MultilingualContent>> {
    let Value::Object(raw) = payload else {
        return Err(AnalysisError::malformed(
            "multilingual reply must be a JSON object keyed by language code",
            &payload.to_string(),
        ));
    };

    let mut content = MultilingualContent::default();
    for (code, block) in raw {
        let code = normalize_key(&code);
        let Value::Object(fields) = block else {
            debug!(language = %code, "skipping non-object language block");
            continue;
        };
        content
            .languages
            .insert(code, normalize_listing(normalize_keys(fields)));
    }

    let missing = requested
        .iter()
        .map(|code| normalize_key(code))
        .filter(|code| !content.languages.contains_key(code))
        .collect();
    Ok(Normalized {
        value: content,
        missing,
    })
}

fn normalize_listing(fields: Map<String, Value>) -> LocalizedListing {
    let mut listing = LocalizedListing::default();
    for (key, value) in fields {
        match ListingField::from_key(&key) {
            Some(ListingField::Title) => listing.title = coerce_text(value),
            Some(ListingField::Description) => listing.description = coerce_text(value),
            Some(ListingField::Features) => listing.features = coerce_list(value),
            None => {
                listing.extra.insert(key, value);
            }
        }
    }
    listing
}

fn coerce_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn coerce_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

/// Scores pass through unvalidated; numeric strings are accepted.
fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}
