use std::collections::{BTreeMap, HashMap};

use crate::models::ProductOffering;
use crate::services::fallback::{first_present, language_candidates};
use crate::services::locale::LocaleResolver;

/// Language tried after the exact and base-language translations.
const SHARED_FALLBACK_LANGUAGE: &str = "en";

/// Where a resolved product name came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSource {
    Base,
    Translation(String),
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub source: NameSource,
}

/// Picks the display title of a catalog item for a buyer language.
#[derive(Debug, Clone)]
pub struct ProductLocalizer {
    locales: LocaleResolver,
    placeholder: String,
}

impl ProductLocalizer {
    pub fn new(locales: LocaleResolver, placeholder: impl Into<String>) -> Self {
        Self {
            locales,
            placeholder: placeholder.into(),
        }
    }

    /// Canonical language the product's base record is written in.
    pub fn source_language(&self, product: &ProductOffering) -> String {
        self.locales
            .canonical_or_default(product.source_language.as_deref())
    }

    /// Resolves the title for `requested` (a canonical code).
    ///
    /// The source language always gets the base title, even an empty one; translated rows are
    /// not guaranteed to carry that language. Other languages try the exact row, the
    /// base-language row, the English row, then the base title, then the placeholder.
    pub fn resolve(&self, product: &ProductOffering, requested: &str) -> ResolvedName {
        let base_title = product.base.title.trim();

        if requested.eq_ignore_ascii_case(&self.source_language(product)) {
            return self.base_or_placeholder(base_title);
        }

        let mut rows: HashMap<String, &str> = HashMap::new();
        for row in &product.translations {
            let (Some(code), Some(text)) = (
                self.locales.canonicalize(&row.language_code),
                row.display_text(),
            ) else {
                continue;
            };
            rows.entry(code).or_insert(text);
        }

        let candidates = language_candidates(requested, &[SHARED_FALLBACK_LANGUAGE.to_string()]);
        match first_present(&rows, &candidates) {
            Some((code, text)) => ResolvedName {
                name: (*text).to_string(),
                source: NameSource::Translation(code.to_string()),
            },
            None => self.base_or_placeholder(base_title),
        }
    }

    pub fn display_name(&self, product: &ProductOffering, requested: &str) -> String {
        self.resolve(product, requested).name
    }

    /// Name entries attached to the gateway line item for later display.
    pub fn name_metadata(
        &self,
        product: &ProductOffering,
        requested: &str,
    ) -> BTreeMap<String, String> {
        let resolved = self.display_name(product, requested);
        let mut meta = BTreeMap::new();
        let base_title = product.base.title.trim();
        if !base_title.is_empty() {
            meta.insert(
                format!("name_{}", self.source_language(product)),
                base_title.to_string(),
            );
        }
        meta.insert(format!("name_{}", requested), resolved.clone());
        meta.insert("lang".to_string(), requested.to_string());
        meta.insert("name".to_string(), resolved);
        meta
    }

    fn base_or_placeholder(&self, base_title: &str) -> ResolvedName {
        if base_title.is_empty() {
            ResolvedName {
                name: self.placeholder.clone(),
                source: NameSource::Placeholder,
            }
        } else {
            ResolvedName {
                name: base_title.to_string(),
                source: NameSource::Base,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocaleConfig;
    use crate::models::{LocalizedText, TranslationRow};

    fn localizer() -> ProductLocalizer {
        ProductLocalizer::new(LocaleResolver::new(&LocaleConfig::default(), "ja"), "Item")
    }

    fn row(code: &str, title: &str) -> TranslationRow {
        TranslationRow {
            language_code: code.into(),
            title: title.into(),
            body: String::new(),
        }
    }

    fn product(base_title: &str, rows: Vec<TranslationRow>) -> ProductOffering {
        ProductOffering {
            site_key: "shop".into(),
            id: "p1".into(),
            base: LocalizedText {
                title: base_title.into(),
                body: String::new(),
            },
            translations: rows,
            source_language: None,
            price_tax_included: Some(500),
        }
    }

    #[test]
    fn source_language_is_pinned_to_base_title() {
        let p = product("抹茶", vec![row("ja", "別名"), row("en", "Matcha")]);
        let resolved = localizer().resolve(&p, "ja");
        assert_eq!(resolved.name, "抹茶");
        assert_eq!(resolved.source, NameSource::Base);
    }

    #[test]
    fn empty_base_title_in_source_language_uses_placeholder_not_rows() {
        let p = product("  ", vec![row("ja", "別名")]);
        let resolved = localizer().resolve(&p, "ja");
        assert_eq!(resolved.name, "Item");
        assert_eq!(resolved.source, NameSource::Placeholder);
    }

    #[test]
    fn exact_then_base_then_english_rows() {
        let p = product(
            "抹茶",
            vec![row("fr", "Thé vert"), row("fr-CA", "Thé matcha"), row("en", "Matcha")],
        );
        let l = localizer();
        assert_eq!(l.display_name(&p, "fr-CA"), "Thé matcha");
        assert_eq!(l.display_name(&p, "fr-BE"), "Thé vert");
        assert_eq!(l.display_name(&p, "de"), "Matcha");
    }

    #[test]
    fn falls_back_to_base_title_then_placeholder() {
        let l = localizer();
        assert_eq!(l.display_name(&product("抹茶", vec![]), "ko"), "抹茶");
        assert_eq!(l.display_name(&product("", vec![]), "ko"), "Item");
    }

    #[test]
    fn row_body_used_when_title_blank_and_codes_canonicalized() {
        let mut blank = row("zh_hant", " ");
        blank.body = "抹茶粉".into();
        let p = product("抹茶", vec![blank]);
        assert_eq!(localizer().display_name(&p, "zh-TW"), "抹茶粉");
    }

    #[test]
    fn explicit_source_language_changes_the_pin() {
        let mut p = product("Green tea", vec![row("ja", "緑茶")]);
        p.source_language = Some("en".into());
        let l = localizer();
        assert_eq!(l.display_name(&p, "en"), "Green tea");
        assert_eq!(l.display_name(&p, "ja"), "緑茶");
    }

    #[test]
    fn metadata_carries_source_and_requested_names() {
        let p = product("抹茶", vec![row("en", "Matcha")]);
        let meta = localizer().name_metadata(&p, "en");
        assert_eq!(meta.get("name").map(String::as_str), Some("Matcha"));
        assert_eq!(meta.get("name_ja").map(String::as_str), Some("抹茶"));
        assert_eq!(meta.get("name_en").map(String::as_str), Some("Matcha"));
        assert_eq!(meta.get("lang").map(String::as_str), Some("en"));
    }
}
