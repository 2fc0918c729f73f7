//! Outbound payment gateway: hosted checkout session creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::GatewayConfig;

pub mod memory;
pub mod stripe;

pub use memory::InMemoryGateway;
pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway answered with an error body; its message is passed through.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Payment gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected payment gateway response: {0}")]
    Decode(String),

    #[error("Payment gateway is not configured: {0}")]
    NotConfigured(String),
}

/// Settlement fields attached to a session, one shape per settlement style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSettlement {
    /// Funds stay with the platform; a later transfer is correlated by this token.
    TransferGroup { transfer_group: String },
    /// Funds go to `destination` minus the inline application fee.
    Destination {
        destination: String,
        application_fee_amount: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
    /// Product-level metadata shown on the gateway dashboard
    pub metadata: BTreeMap<String, String>,
}

/// Everything needed to open one hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionParams {
    /// Lower-case ISO code
    pub currency: String,
    pub line_items: Vec<SessionLineItem>,
    pub locale: String,
    pub collect_phone_number: bool,
    pub require_billing_address: bool,
    pub shipping_countries: Vec<String>,
    pub client_reference_id: String,
    pub success_url: String,
    pub cancel_url: String,
    pub allow_promotion_codes: bool,
    pub settlement: SessionSettlement,
    pub metadata: BTreeMap<String, String>,
}

/// A session opened by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
        idempotency_key: Option<&str>,
    ) -> Result<GatewaySession, GatewayError>;
}

/// Builds the gateway named by `config.provider`.
pub fn build_gateway(config: &GatewayConfig) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
    if config.provider.eq_ignore_ascii_case("in-memory") {
        return Ok(Arc::new(InMemoryGateway::new()));
    }
    Ok(Arc::new(StripeGateway::from_config(config)?))
}
