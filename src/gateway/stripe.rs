use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use url::form_urlencoded;

use super::{
    CheckoutSessionParams, GatewayError, GatewaySession, PaymentGateway, SessionSettlement,
};
use crate::config::GatewayConfig;

const SESSIONS_PATH: &str = "/v1/checkout/sessions";
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Stripe-compatible hosted checkout client (form-encoded, bearer auth).
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let secret_key = config
            .secret_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::NotConfigured("gateway.secret_key is not set".into()))?;
        Self::new(
            config.api_base.clone(),
            secret_key,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

/// Flattens session parameters into bracketed form fields.
pub fn encode_session_params(params: &CheckoutSessionParams) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("locale".into(), params.locale.clone()),
        ("customer_creation".into(), "always".into()),
        ("client_reference_id".into(), params.client_reference_id.clone()),
        ("success_url".into(), params.success_url.clone()),
        ("cancel_url".into(), params.cancel_url.clone()),
    ];

    for (i, item) in params.line_items.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        fields.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        fields.push((
            format!("{prefix}[price_data][currency]"),
            params.currency.clone(),
        ));
        fields.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        fields.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        for (key, value) in &item.metadata {
            fields.push((
                format!("{prefix}[price_data][product_data][metadata][{key}]"),
                value.clone(),
            ));
        }
    }

    if params.collect_phone_number {
        fields.push(("phone_number_collection[enabled]".into(), "true".into()));
    }
    if params.require_billing_address {
        fields.push(("billing_address_collection".into(), "required".into()));
    }
    for (i, country) in params.shipping_countries.iter().enumerate() {
        fields.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.clone(),
        ));
    }
    if params.allow_promotion_codes {
        fields.push(("allow_promotion_codes".into(), "true".into()));
    }

    match &params.settlement {
        SessionSettlement::TransferGroup { transfer_group } => {
            fields.push((
                "payment_intent_data[transfer_group]".into(),
                transfer_group.clone(),
            ));
        }
        SessionSettlement::Destination {
            destination,
            application_fee_amount,
        } => {
            fields.push((
                "payment_intent_data[application_fee_amount]".into(),
                application_fee_amount.to_string(),
            ));
            fields.push((
                "payment_intent_data[transfer_data][destination]".into(),
                destination.clone(),
            ));
        }
    }

    for (key, value) in &params.metadata {
        fields.push((format!("metadata[{key}]"), value.clone()));
    }
    fields
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(
        skip(self, params, idempotency_key),
        fields(line_items = params.line_items.len(), client_reference_id = %params.client_reference_id)
    )]
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
        idempotency_key: Option<&str>,
    ) -> Result<GatewaySession, GatewayError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(encode_session_params(params))
            .finish();

        let mut request = self
            .client
            .post(format!("{}{}", self.api_base, SESSIONS_PATH))
            .bearer_auth(&self.secret_key)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        if let Some(key) = idempotency_key {
            request = request.header(IDEMPOTENCY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&bytes)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| format!("payment gateway returned HTTP {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "Checkout session creation rejected");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse =
            serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let url = session
            .url
            .ok_or_else(|| GatewayError::Decode(format!("session {} has no url", session.id)))?;

        info!(session_id = %session.id, "Opened checkout session");
        Ok(GatewaySession {
            id: session.id,
            url,
        })
    }
}
