use serde::{Deserialize, Serialize};

/// Seller account record maintained by the onboarding flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantAccount {
    pub site_key: String,
    /// Gateway sub-account id; absent until onboarding starts
    #[serde(default)]
    pub sub_account_id: Option<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub sales_suspended: bool,
}

impl MerchantAccount {
    /// The sub-account id, if it looks like a real gateway account.
    pub fn connected_sub_account(&self, prefix: &str) -> Option<&str> {
        self.sub_account_id
            .as_deref()
            .map(str::trim)
            .filter(|id| id.starts_with(prefix) && id.len() > prefix.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRow {
    pub language_code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl TranslationRow {
    /// Trimmed title, falling back to the trimmed body.
    pub fn display_text(&self) -> Option<&str> {
        let title = self.title.trim();
        if !title.is_empty() {
            return Some(title);
        }
        let body = self.body.trim();
        (!body.is_empty()).then_some(body)
    }
}

/// Catalog item as stored per site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOffering {
    pub site_key: String,
    pub id: String,
    /// Source-language record
    #[serde(default)]
    pub base: LocalizedText,
    #[serde(default)]
    pub translations: Vec<TranslationRow>,
    /// Language `base` is written in; the configured default applies when absent
    #[serde(default)]
    pub source_language: Option<String>,
    /// Tax-inclusive unit price in the settlement currency
    #[serde(default)]
    pub price_tax_included: Option<i64>,
}
