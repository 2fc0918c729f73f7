use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::config::{AppConfig, CheckoutConfig};
use crate::errors::ServiceError;
use crate::gateway::{CheckoutSessionParams, PaymentGateway, SessionLineItem};
use crate::models::{
    CheckoutLine, CheckoutStatus, MerchantAccount, OrderItem, PendingCheckout, ProductOffering,
    SettlementStyle,
};
use crate::repositories::CheckoutRepository;
use crate::services::locale::{gateway_currency, LocaleResolver};
use crate::services::localization::ProductLocalizer;
use crate::services::origin::OriginPolicy;
use crate::services::pricing::PricingEngine;
use crate::services::settlement::{
    keyed_transfer_group, new_transfer_group, SettlementPlan, SettlementStrategy,
};
use crate::services::shipping::{ShippingQuote, ShippingResolver};

/// Gateway limit on a single metadata value.
const METADATA_VALUE_LIMIT: usize = 500;
const IDEMPOTENCY_KEY_MIN_LEN: usize = 8;
const IDEMPOTENCY_KEY_MAX_LEN: usize = 255;

/// One requested cart line.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CartItemRequest {
    #[validate(length(min = 1, max = 128))]
    pub id: String,
    /// Requested quantity; clamped into [1, 999], never rejected
    #[serde(default, alias = "quantity", alias = "count", alias = "q")]
    #[schema(value_type = Option<f64>)]
    pub qty: Option<Value>,
}

/// Session-creation request body.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutRequest {
    #[validate(length(min = 1, max = 128), custom = "validate_site_key")]
    pub site_key: String,
    #[validate(length(min = 1, max = 200))]
    pub items: Vec<CartItemRequest>,
    /// Buyer UI language, any spelling
    #[serde(default)]
    #[validate(length(max = 35))]
    pub lang: Option<String>,
    /// Storefront origin for the success and cancel redirects
    #[serde(default)]
    pub origin: Option<String>,
}

fn validate_site_key(site_key: &str) -> Result<(), ValidationError> {
    let ok = site_key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("site_key");
        err.message = Some("siteKey may only contain letters, digits, '-', '_' and '.'".into());
        Err(err)
    }
}

/// SHA-256 hex of a client idempotency key after checking its shape.
pub fn idempotency_key_hash(key: &str) -> Result<String, ServiceError> {
    let visible_ascii = key.bytes().all(|b| (0x21..=0x7e).contains(&b));
    if !(IDEMPOTENCY_KEY_MIN_LEN..=IDEMPOTENCY_KEY_MAX_LEN).contains(&key.len()) || !visible_ascii {
        return Err(ServiceError::ValidationError(format!(
            "Idempotency-Key must be {}-{} visible ASCII characters",
            IDEMPOTENCY_KEY_MIN_LEN, IDEMPOTENCY_KEY_MAX_LEN
        )));
    }
    Ok(hex::encode(Sha256::digest(key.as_bytes())))
}

/// Outcome of a session-creation call.
#[derive(Debug, Clone)]
pub struct CheckoutSessionCreated {
    pub checkout: PendingCheckout,
    /// True when an earlier call with the same idempotency key was answered again
    pub replayed: bool,
}

impl CheckoutSessionCreated {
    pub fn url(&self) -> &str {
        &self.checkout.checkout_url
    }
}

/// Priced cart before any gateway interaction.
struct PricedCart {
    lines: Vec<CheckoutLine>,
    line_items: Vec<SessionLineItem>,
    subtotal: i64,
}

/// Opens hosted payment sessions and records the pending checkout.
#[derive(Clone)]
pub struct CheckoutService {
    repository: Arc<dyn CheckoutRepository>,
    gateway: Arc<dyn PaymentGateway>,
    settings: Arc<CheckoutConfig>,
    origins: OriginPolicy,
    locales: LocaleResolver,
    localizer: ProductLocalizer,
    pricing: PricingEngine,
    shipping: ShippingResolver,
}

impl CheckoutService {
    pub fn new(
        repository: Arc<dyn CheckoutRepository>,
        gateway: Arc<dyn PaymentGateway>,
        origins: OriginPolicy,
        config: &AppConfig,
    ) -> Self {
        let settings = config.checkout.clone();
        let locales = LocaleResolver::new(&config.locale, &settings.default_language);
        let localizer = ProductLocalizer::new(locales.clone(), settings.placeholder_title.clone());
        let pricing = PricingEngine::new(settings.max_quantity, settings.rounding_policy);
        let shipping = ShippingResolver::new(
            repository.clone(),
            settings.default_document_id.clone(),
            settings.fallback_languages.clone(),
        );

        Self {
            repository,
            gateway,
            settings: Arc::new(settings),
            origins,
            locales,
            localizer,
            pricing,
            shipping,
        }
    }

    pub fn origins(&self) -> &OriginPolicy {
        &self.origins
    }

    /// Prices the cart, opens a gateway session and persists the pending checkout.
    ///
    /// The origin header must already have passed [`OriginPolicy::check`].
    #[instrument(
        skip(self, request, header_origin, idempotency_key),
        fields(site_key = %request.site_key, style = %style)
    )]
    pub async fn create_session(
        &self,
        request: CreateCheckoutRequest,
        style: SettlementStyle,
        header_origin: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<CheckoutSessionCreated, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
        }
        let key_hash = idempotency_key.map(idempotency_key_hash).transpose()?;
        let site_key = request.site_key.trim();
        let strategy = SettlementStrategy::for_style(style, &self.settings);

        let merchant = self.repository.merchant_account(site_key).await?;
        let sub_account_id = self.authorize_merchant(site_key, merchant.as_ref(), &strategy)?;

        let redirect_base = self
            .origins
            .redirect_base(request.origin.as_deref(), header_origin)?;

        let ui_language = request
            .lang
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        let language = self.locales.canonical_or_default(ui_language);
        let locale = self
            .locales
            .checkout_locale(ui_language.unwrap_or_else(|| self.locales.default_language()));

        let cart = self.collapse_cart(&request.items);

        let fingerprint = match &key_hash {
            Some(hash) => {
                let fingerprint = request_fingerprint(&FingerprintInput {
                    style,
                    site_key,
                    cart: &cart,
                    ui_language,
                    redirect_base: &redirect_base,
                })?;
                if let Some(existing) = self
                    .repository
                    .pending_checkout_by_idempotency_key(site_key, hash)
                    .await?
                {
                    if existing.request_fingerprint.as_deref() != Some(fingerprint.as_str()) {
                        warn!(session_id = %existing.session_id, "Idempotency key reused with a different request");
                        return Err(ServiceError::IdempotencyConflict(
                            "Idempotency-Key was already used with a different request".into(),
                        ));
                    }
                    info!(session_id = %existing.session_id, "Replaying checkout session for idempotency key");
                    return Ok(CheckoutSessionCreated {
                        checkout: existing,
                        replayed: true,
                    });
                }
                Some(fingerprint)
            }
            None => None,
        };

        let mut priced = self.price_cart(site_key, &language, &cart).await?;

        let quote = self.shipping.quote(site_key, &language, priced.subtotal).await?;
        if quote.fee > 0 {
            priced.line_items.push(SessionLineItem {
                name: self.settings.shipping_line_label.clone(),
                unit_amount: quote.fee,
                quantity: 1,
                metadata: BTreeMap::from([
                    ("kind".to_string(), "shipping".to_string()),
                    ("siteKey".to_string(), site_key.to_string()),
                ]),
            });
        }
        let grand_total = priced
            .subtotal
            .checked_add(quote.fee)
            .ok_or_else(|| ServiceError::ValidationError("amount out of range: total".into()))?;

        let transfer_group = match &key_hash {
            Some(hash) => keyed_transfer_group(site_key, hash),
            None => new_transfer_group(site_key, Utc::now()),
        };
        let plan = strategy.plan(&sub_account_id, priced.subtotal, transfer_group);

        let items: Vec<OrderItem> = priced.lines.iter().map(OrderItem::from).collect();
        let metadata = session_metadata(&MetadataInput {
            site_key,
            ui_language,
            language: &language,
            currency: &self.settings.settlement_currency,
            sub_account_id: &sub_account_id,
            plan: &plan,
            subtotal: priced.subtotal,
            quote: &quote,
            grand_total,
            items: &items,
        })?;

        let params = CheckoutSessionParams {
            currency: gateway_currency(&self.settings.settlement_currency),
            line_items: priced.line_items,
            locale: locale.clone(),
            collect_phone_number: true,
            require_billing_address: true,
            shipping_countries: self.settings.shipping_countries.clone(),
            client_reference_id: site_key.to_string(),
            success_url: format!(
                "{}/cart?session_id={{CHECKOUT_SESSION_ID}}&status=success",
                redirect_base
            ),
            cancel_url: format!("{}/cart", redirect_base),
            allow_promotion_codes: self.settings.allow_promotion_codes,
            settlement: plan.session.clone(),
            metadata,
        };

        let session = self
            .gateway
            .create_checkout_session(&params, idempotency_key)
            .await
            .map_err(|e| {
                error!(error = %e, "Payment gateway rejected checkout session");
                ServiceError::from(e)
            })?;

        let checkout = PendingCheckout {
            session_id: session.id.clone(),
            site_key: site_key.to_string(),
            status: CheckoutStatus::Pending,
            settlement_style: plan.style,
            checkout_url: session.url.clone(),
            items: priced.lines,
            subtotal: priced.subtotal,
            shipping_fee: quote.fee,
            grand_total,
            platform_fee: plan.platform_fee,
            fee_rate: plan.fee_rate,
            currency: self.settings.settlement_currency.to_ascii_uppercase(),
            locale,
            language,
            ui_language: ui_language.map(str::to_string),
            sub_account_id,
            transfer_group: plan.transfer_group,
            free_shipping: quote.is_free(),
            free_shipping_threshold: quote.threshold,
            free_shipping_by_threshold: quote.free_by_threshold,
            idempotency_key_hash: key_hash,
            request_fingerprint: fingerprint,
            created_at: Utc::now(),
        };

        // No transaction spans the gateway call and this write.
        if let Err(err) = self.repository.insert_pending_checkout(&checkout).await {
            error!(
                session_id = %session.id,
                site_key,
                error = %err,
                "Checkout session opened but pending checkout was not recorded; session is orphaned"
            );
            return Err(err);
        }

        info!(
            session_id = %checkout.session_id,
            subtotal = checkout.subtotal,
            shipping_fee = checkout.shipping_fee,
            platform_fee = checkout.platform_fee,
            "Checkout session created"
        );
        Ok(CheckoutSessionCreated {
            checkout,
            replayed: false,
        })
    }

    /// Returns the connected sub-account id, or why this merchant cannot sell.
    fn authorize_merchant(
        &self,
        site_key: &str,
        merchant: Option<&MerchantAccount>,
        strategy: &SettlementStrategy,
    ) -> Result<String, ServiceError> {
        let merchant = merchant.ok_or_else(|| {
            ServiceError::SubAccountMissing(format!("no merchant account for site {}", site_key))
        })?;
        if merchant.sales_suspended {
            return Err(ServiceError::SalesSuspended(site_key.to_string()));
        }
        let sub_account_id = merchant
            .connected_sub_account(&self.settings.sub_account_prefix)
            .ok_or_else(|| {
                ServiceError::SubAccountMissing(format!(
                    "site {} has no connected sub-account",
                    site_key
                ))
            })?
            .to_string();
        strategy.ensure_capable(merchant)?;
        Ok(sub_account_id)
    }

    /// Requested ids in first-seen order with clamped quantities; a repeated id keeps its
    /// position and takes the last quantity.
    fn collapse_cart(&self, items: &[CartItemRequest]) -> Vec<(String, u32)> {
        let mut order: Vec<String> = Vec::with_capacity(items.len());
        let mut quantities: HashMap<String, u32> = HashMap::with_capacity(items.len());
        for item in items {
            let id = item.id.trim();
            if id.is_empty() {
                continue;
            }
            let qty = self.pricing.clamp_quantity(item.qty.as_ref());
            if quantities.insert(id.to_string(), qty).is_none() {
                order.push(id.to_string());
            }
        }
        order
            .into_iter()
            .filter_map(|id| quantities.remove(&id).map(|qty| (id, qty)))
            .collect()
    }

    /// Loads offerings in fixed-size batches issued concurrently.
    async fn load_products(
        &self,
        site_key: &str,
        ids: &[String],
    ) -> Result<HashMap<String, ProductOffering>, ServiceError> {
        let batch_size = self.settings.product_batch_size.max(1);
        let batches = ids
            .chunks(batch_size)
            .map(|chunk| self.repository.products_by_ids(site_key, chunk));
        let loaded = try_join_all(batches).await?;

        Ok(loaded
            .into_iter()
            .flatten()
            .filter(|product| product.site_key == site_key)
            .map(|product| (product.id.clone(), product))
            .collect())
    }

    async fn price_cart(
        &self,
        site_key: &str,
        language: &str,
        cart: &[(String, u32)],
    ) -> Result<PricedCart, ServiceError> {
        let ids: Vec<String> = cart.iter().map(|(id, _)| id.clone()).collect();
        let products = self.load_products(site_key, &ids).await?;

        let mut lines = Vec::with_capacity(cart.len());
        let mut line_items = Vec::with_capacity(cart.len() + 1);
        for (id, quantity) in cart {
            let Some(product) = products.get(id) else {
                debug!(product_id = %id, "Skipping unknown product");
                continue;
            };
            let name = self.localizer.display_name(product, language);
            let Some(line) =
                self.pricing
                    .price_line(id, name, product.price_tax_included, *quantity)?
            else {
                debug!(product_id = %id, "Skipping product without a positive price");
                continue;
            };

            let mut metadata = self.localizer.name_metadata(product, language);
            metadata.insert("productId".to_string(), id.clone());
            metadata.insert("siteKey".to_string(), site_key.to_string());
            metadata.insert("baseAmount".to_string(), line.unit_amount.to_string());

            line_items.push(SessionLineItem {
                name: line.name.clone(),
                unit_amount: line.unit_amount,
                quantity: line.quantity,
                metadata,
            });
            lines.push(line);
        }

        if lines.is_empty() {
            return Err(ServiceError::NothingPurchasable);
        }
        let subtotal = self.pricing.subtotal(&lines)?;

        Ok(PricedCart {
            lines,
            line_items,
            subtotal,
        })
    }
}

struct FingerprintInput<'a> {
    style: SettlementStyle,
    site_key: &'a str,
    cart: &'a [(String, u32)],
    ui_language: Option<&'a str>,
    redirect_base: &'a str,
}

/// SHA-256 hex over everything in the request that shapes the gateway session.
fn request_fingerprint(input: &FingerprintInput<'_>) -> Result<String, ServiceError> {
    let canonical = serde_json::to_vec(&(
        input.style.to_string(),
        input.site_key,
        input.cart,
        input.ui_language,
        input.redirect_base,
    ))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

struct MetadataInput<'a> {
    site_key: &'a str,
    ui_language: Option<&'a str>,
    language: &'a str,
    currency: &'a str,
    sub_account_id: &'a str,
    plan: &'a SettlementPlan,
    subtotal: i64,
    quote: &'a ShippingQuote,
    grand_total: i64,
    items: &'a [OrderItem],
}

/// Session metadata from which the whole computation can be reconstructed later.
fn session_metadata(input: &MetadataInput<'_>) -> Result<BTreeMap<String, String>, ServiceError> {
    let mut meta = BTreeMap::new();
    let mut put = |key: &str, value: String| {
        meta.insert(key.to_string(), value);
    };
    put("siteKey", input.site_key.to_string());
    put("uiLang", input.ui_language.unwrap_or_default().to_string());
    put("lang", input.language.to_string());
    put("currency", input.currency.to_ascii_uppercase());
    put("platformFeePct", fee_rate_string(input.plan.fee_rate));
    put("transferGroup", input.plan.transfer_group.clone());
    put("sellerConnectId", input.sub_account_id.to_string());
    put("settlementStyle", input.plan.style.to_string());
    put("subtotal", input.subtotal.to_string());
    put("shippingFee", input.quote.fee.to_string());
    put("grandTotal", input.grand_total.to_string());
    put("platformFee", input.plan.platform_fee.to_string());
    put("freeShipping", input.quote.is_free().to_string());
    put("freeShippingThreshold", input.quote.threshold.to_string());
    put("freeShippingByThreshold", input.quote.free_by_threshold.to_string());

    let items = serde_json::to_string(input.items)?;
    if items.len() <= METADATA_VALUE_LIMIT {
        put("items", items);
    } else {
        warn!(
            site_key = input.site_key,
            length = items.len(),
            "Line items exceed the metadata value limit; omitted from session metadata"
        );
    }
    Ok(meta)
}

fn fee_rate_string(rate: Decimal) -> String {
    rate.normalize().to_string()
}
