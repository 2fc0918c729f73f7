//! Ordered key fallback shared by the locale, shipping fee and threshold lookups.

use std::collections::HashMap;

/// Language subtag of a canonical code (`"pt-BR"` → `"pt"`).
pub fn base_language(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

/// Lookup keys for `canonical`: the exact code, its base language, then each fallback.
/// Empty and repeated keys are skipped so each key is tried once.
pub fn language_candidates(canonical: &str, fallbacks: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(2 + fallbacks.len());
    let ordered = [canonical, base_language(canonical)]
        .into_iter()
        .chain(fallbacks.iter().map(String::as_str));
    for key in ordered {
        if !key.is_empty() && !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

/// First candidate for which `lookup` yields a value.
pub fn first_present_by<'c, T, F>(candidates: &'c [String], mut lookup: F) -> Option<(&'c str, T)>
where
    F: FnMut(&str) -> Option<T>,
{
    candidates
        .iter()
        .find_map(|key| lookup(key).map(|value| (key.as_str(), value)))
}

/// First candidate whose key is present in `table`. Presence is what counts, so a stored
/// zero is returned rather than skipped.
pub fn first_present<'c, 't, V>(
    table: &'t HashMap<String, V>,
    candidates: &'c [String],
) -> Option<(&'c str, &'t V)> {
    first_present_by(candidates, |key| table.get(key))
}
