//! Language utilities for target language tags
//!
//! Target tags double as column suffixes (`name_<tag>`), so they follow the
//! table's naming rather than strict ISO 639-1. A couple of legacy tags
//! differ from the codes the translation service expects.

use anyhow::{Result, anyhow};
use isolang::Language;

/// Tags whose service code differs from the tag itself
const SERVICE_CODE_ALIASES: &[(&str, &str)] = &[
    ("jp", "jpn"),
    ("kr", "kor"),
];

/// Map an internal language tag to the code the translation service expects
pub fn map_language_code(tag: &str) -> &str {
    SERVICE_CODE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == tag)
        .map(|(_, code)| *code)
        .unwrap_or(tag)
}

/// Resolve a service language code to an ISO language.
///
/// Region subtags (`zh_tw`, `pt-BR`) resolve through their base language.
fn resolve_language(code: &str) -> Option<Language> {
    let base = code.trim().split(['_', '-']).next().unwrap_or_default();
    let normalized = base.to_lowercase();

    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    }
}

/// Check whether a tag maps to a language the service can be asked for
pub fn is_known_language(tag: &str) -> bool {
    resolve_language(map_language_code(tag)).is_some()
}

/// Get the English language name for an internal tag
pub fn get_language_name(tag: &str) -> Result<String> {
    let lang = resolve_language(map_language_code(tag))
        .ok_or_else(|| anyhow!("Unknown language tag: {}", tag))?;

    Ok(lang.to_name().to_string())
}

/// Destination column for a language tag
pub fn column_for_language(tag: &str) -> String {
    format!("name_{}", tag)
}
