use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::errors::ServiceError;
use crate::models::{ShippingPolicy, ShippingPriceTable};
use crate::repositories::CheckoutRepository;
use crate::services::fallback::{first_present, language_candidates};

/// Resolved shipping charge for one cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingQuote {
    /// Fee from the price table; 0 when no candidate key exists
    pub table_fee: i64,
    pub matched_price_key: Option<String>,
    pub policy_enabled: bool,
    pub threshold: i64,
    pub free_by_threshold: bool,
    pub free_by_table: bool,
    /// Amount actually charged
    pub fee: i64,
}

impl ShippingQuote {
    pub fn is_free(&self) -> bool {
        self.fee == 0
    }
}

/// Pure quote computation over already-selected documents.
pub fn compute_quote(
    table: Option<&ShippingPriceTable>,
    policy: Option<&ShippingPolicy>,
    candidates: &[String],
    subtotal: i64,
) -> ShippingQuote {
    let (matched_price_key, table_fee) = table
        .and_then(|t| first_present(&t.prices, candidates))
        .map(|(key, fee)| (Some(key.to_string()), (*fee).max(0)))
        .unwrap_or((None, 0));

    let policy_enabled = policy.map(|p| p.enabled).unwrap_or(false);
    let threshold = policy
        .map(|p| {
            first_present(&p.threshold_by_language, candidates)
                .map(|(_, value)| *value)
                .or(p.default_threshold)
                .unwrap_or(0)
        })
        .unwrap_or(0)
        .max(0);

    let free_by_threshold = policy_enabled && threshold > 0 && subtotal >= threshold;
    let free_by_table = table_fee == 0;
    let fee = if free_by_threshold || free_by_table {
        0
    } else {
        table_fee
    };

    ShippingQuote {
        table_fee,
        matched_price_key,
        policy_enabled,
        threshold,
        free_by_threshold,
        free_by_table,
        fee,
    }
}

/// Loads the site or shared shipping documents and quotes a fee.
#[derive(Clone)]
pub struct ShippingResolver {
    repository: Arc<dyn CheckoutRepository>,
    default_document_id: String,
    fallback_languages: Vec<String>,
}

impl ShippingResolver {
    pub fn new(
        repository: Arc<dyn CheckoutRepository>,
        default_document_id: impl Into<String>,
        fallback_languages: Vec<String>,
    ) -> Self {
        Self {
            repository,
            default_document_id: default_document_id.into(),
            fallback_languages,
        }
    }

    /// The site's price table if one exists at all, else the shared default.
    pub async fn price_table(
        &self,
        site_key: &str,
    ) -> Result<Option<ShippingPriceTable>, ServiceError> {
        if let Some(table) = self.repository.shipping_price_table(site_key).await? {
            return Ok(Some(table));
        }
        self.repository
            .shipping_price_table(&self.default_document_id)
            .await
    }

    /// The site's policy if one exists at all, else the shared default.
    pub async fn policy(&self, site_key: &str) -> Result<Option<ShippingPolicy>, ServiceError> {
        if let Some(policy) = self.repository.shipping_policy(site_key).await? {
            return Ok(Some(policy));
        }
        self.repository
            .shipping_policy(&self.default_document_id)
            .await
    }

    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        site_key: &str,
        language: &str,
        subtotal: i64,
    ) -> Result<ShippingQuote, ServiceError> {
        let (table, policy) = tokio::try_join!(self.price_table(site_key), self.policy(site_key))?;
        let candidates = language_candidates(language, &self.fallback_languages);
        let quote = compute_quote(table.as_ref(), policy.as_ref(), &candidates, subtotal);

        debug!(
            site_key,
            language,
            matched_key = ?quote.matched_price_key,
            fee = quote.fee,
            threshold = quote.threshold,
            "Resolved shipping quote"
        );
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryRepository;
    use std::collections::HashMap;

    fn candidates(lang: &str) -> Vec<String> {
        language_candidates(lang, &["en".to_string(), "ja".to_string()])
    }

    fn table(doc_id: &str, entries: &[(&str, i64)]) -> ShippingPriceTable {
        ShippingPriceTable {
            doc_id: doc_id.into(),
            prices: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn policy(doc_id: &str, enabled: bool, entries: &[(&str, i64)]) -> ShippingPolicy {
        ShippingPolicy {
            doc_id: doc_id.into(),
            enabled,
            threshold_by_language: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            default_threshold: None,
        }
    }

    #[test]
    fn no_configuration_means_free_shipping() {
        let quote = compute_quote(None, None, &candidates("en"), 1000);
        assert_eq!(quote.fee, 0);
        assert!(quote.free_by_table);
        assert_eq!(quote.matched_price_key, None);
    }

    #[test]
    fn explicit_zero_is_authoritative() {
        let t = table("shop", &[("en", 0), ("ja", 800)]);
        let p = policy("shop", true, &[("en", 3000)]);
        let quote = compute_quote(Some(&t), Some(&p), &candidates("en"), 1000);
        assert_eq!(quote.fee, 0);
        assert!(quote.free_by_table);
        assert!(!quote.free_by_threshold);
        assert_eq!(quote.matched_price_key.as_deref(), Some("en"));
    }

    #[test]
    fn missing_language_falls_back_to_english() {
        let t = table("shop", &[("en", 900), ("ja", 600)]);
        let quote = compute_quote(Some(&t), None, &candidates("fr"), 1000);
        assert_eq!(quote.fee, 900);
        assert_eq!(quote.matched_price_key.as_deref(), Some("en"));
    }

    #[test]
    fn base_language_beats_english() {
        let t = table("shop", &[("pt", 700), ("en", 900)]);
        let quote = compute_quote(Some(&t), None, &candidates("pt-BR"), 1000);
        assert_eq!(quote.fee, 700);
    }

    #[test]
    fn threshold_waives_fee_when_enabled() {
        let t = table("shop", &[("ja", 800)]);
        let p = policy("shop", true, &[("ja", 5000)]);
        assert_eq!(compute_quote(Some(&t), Some(&p), &candidates("ja"), 5000).fee, 0);
        assert_eq!(compute_quote(Some(&t), Some(&p), &candidates("ja"), 4999).fee, 800);

        let disabled = policy("shop", false, &[("ja", 5000)]);
        assert_eq!(
            compute_quote(Some(&t), Some(&disabled), &candidates("ja"), 9000).fee,
            800
        );
    }

    #[test]
    fn zero_threshold_never_waives() {
        let t = table("shop", &[("ja", 800)]);
        let p = policy("shop", true, &[("ja", 0), ("en", 100)]);
        let quote = compute_quote(Some(&t), Some(&p), &candidates("ja"), 9000);
        assert_eq!(quote.threshold, 0);
        assert_eq!(quote.fee, 800);
    }

    #[test]
    fn legacy_default_threshold_is_last_resort() {
        let t = table("shop", &[("ja", 800)]);
        let mut p = policy("shop", true, &[("de", 100)]);
        p.default_threshold = Some(3000);
        let quote = compute_quote(Some(&t), Some(&p), &candidates("ko"), 3000);
        assert_eq!(quote.threshold, 3000);
        assert!(quote.free_by_threshold);
    }

    #[tokio::test]
    async fn site_document_shadows_default_even_when_empty() {
        let repo = InMemoryRepository::new();
        repo.put_shipping_price_table(table("default", &[("en", 1200)]))
            .await;
        repo.put_shipping_price_table(ShippingPriceTable {
            doc_id: "shop".into(),
            prices: HashMap::new(),
        })
        .await;
        let resolver = ShippingResolver::new(
            Arc::new(repo),
            "default",
            vec!["en".to_string(), "ja".to_string()],
        );

        let quote = resolver.quote("shop", "en", 1000).await.unwrap();
        assert_eq!(quote.fee, 0);

        let other = resolver.quote("other-shop", "en", 1000).await.unwrap();
        assert_eq!(other.fee, 1200);
    }

    #[tokio::test]
    async fn policy_and_table_fall_back_independently() {
        let repo = InMemoryRepository::new();
        repo.put_shipping_price_table(table("shop", &[("ja", 800)]))
            .await;
        repo.put_shipping_policy(policy("default", true, &[("ja", 2000)]))
            .await;
        let resolver = ShippingResolver::new(
            Arc::new(repo),
            "default",
            vec!["en".to_string(), "ja".to_string()],
        );

        let quote = resolver.quote("shop", "ja", 2500).await.unwrap();
        assert_eq!(quote.table_fee, 800);
        assert!(quote.free_by_threshold);
        assert_eq!(quote.fee, 0);
    }
}
