use std::collections::HashMap;

use crate::config::{LocaleConfig, ZERO_DECIMAL_CURRENCIES};
use crate::services::fallback::base_language;

/// Display locale the gateway picks for itself
pub const AUTO_LOCALE: &str = "auto";

/// Normalizes buyer language tags and maps them onto gateway display locales.
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    aliases: HashMap<String, String>,
    display_locales: Vec<String>,
    display_overrides: HashMap<String, String>,
    default_language: String,
}

impl LocaleResolver {
    pub fn new(config: &LocaleConfig, default_language: &str) -> Self {
        let normalize_keys = |table: &HashMap<String, String>| {
            table
                .iter()
                .map(|(k, v)| (normalize(k), v.trim().to_string()))
                .collect::<HashMap<_, _>>()
        };
        Self {
            aliases: normalize_keys(&config.aliases),
            display_locales: config.display_locales.clone(),
            display_overrides: normalize_keys(&config.display_overrides),
            default_language: default_language.to_string(),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Canonical code for `raw`, or `None` when it is not a usable language tag.
    pub fn canonicalize(&self, raw: &str) -> Option<String> {
        let tag = normalize(raw);
        if tag.is_empty() || !is_well_formed(&tag) {
            return None;
        }
        if let Some(alias) = self.aliases.get(&tag) {
            return Some(alias.clone());
        }

        let mut subtags = tag.split('-');
        let base = subtags.next()?;
        if !(2..=3).contains(&base.len()) || !base.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let rest: Vec<&str> = subtags.collect();

        if base == "zh" {
            return Some(han_variant(&rest));
        }

        Some(match rest.iter().find(|s| is_region(s)) {
            Some(region) => format!("{}-{}", base, region.to_ascii_uppercase()),
            None => base.to_string(),
        })
    }

    /// Canonical code for business logic; unusable input yields the default language.
    pub fn canonical_or_default(&self, raw: Option<&str>) -> String {
        raw.and_then(|r| self.canonicalize(r))
            .unwrap_or_else(|| self.default_language.clone())
    }

    /// Nearest gateway display locale: exact match, then base language, then `auto`.
    pub fn checkout_locale(&self, raw: &str) -> String {
        let Some(canonical) = self.canonicalize(raw) else {
            return AUTO_LOCALE.to_string();
        };
        let wanted = self
            .display_overrides
            .get(&canonical.to_ascii_lowercase())
            .cloned()
            .unwrap_or(canonical);

        self.find_display(&wanted)
            .or_else(|| self.find_display(base_language(&wanted)))
            .unwrap_or_else(|| AUTO_LOCALE.to_string())
    }

    fn find_display(&self, code: &str) -> Option<String> {
        self.display_locales
            .iter()
            .find(|locale| locale.eq_ignore_ascii_case(code))
            .cloned()
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('_', "-")
}

fn is_well_formed(tag: &str) -> bool {
    tag.split('-').all(|subtag| {
        !subtag.is_empty() && subtag.len() <= 8 && subtag.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

fn is_region(subtag: &str) -> bool {
    (subtag.len() == 2 && subtag.chars().all(|c| c.is_ascii_alphabetic()))
        || (subtag.len() == 3 && subtag.chars().all(|c| c.is_ascii_digit()))
}

/// Simplified variants collapse to `zh`; Hong Kong/Macau and traditional get their own codes.
fn han_variant(subtags: &[&str]) -> String {
    let has = |wanted: &str| subtags.iter().any(|s| *s == wanted);
    if has("hans") || has("cn") || has("sg") {
        "zh".to_string()
    } else if has("hk") || has("mo") {
        "zh-HK".to_string()
    } else if has("hant") || has("tw") {
        "zh-TW".to_string()
    } else {
        match subtags.iter().find(|s| is_region(s)) {
            Some(region) => format!("zh-{}", region.to_ascii_uppercase()),
            None => "zh".to_string(),
        }
    }
}

/// Whether amounts in `code` are stored without minor units.
pub fn is_zero_decimal(code: &str) -> bool {
    ZERO_DECIMAL_CURRENCIES.contains(&code.trim().to_ascii_uppercase().as_str())
}

/// Currency code in the form the gateway expects.
pub fn gateway_currency(code: &str) -> String {
    code.trim().to_ascii_lowercase()
}
