use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// How funds reach the seller's sub-account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SettlementStyle {
    /// Platform collects the charge; a later transfer pays the seller
    SeparateChargesAndTransfers,
    /// Charge is routed to the seller with the platform fee deducted inline
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckoutStatus {
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Paid,
}

/// One priced cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_amount: i64,
    pub line_total: i64,
}

/// Compact line item carried in session metadata and copied into finalized orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub qty: u32,
    pub unit_amount: i64,
}

impl From<&CheckoutLine> for OrderItem {
    fn from(line: &CheckoutLine) -> Self {
        Self {
            id: Some(line.product_id.clone()),
            name: line.name.clone(),
            qty: line.quantity,
            unit_amount: line.unit_amount,
        }
    }
}

/// Optimistic record written when a payment session is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCheckout {
    /// Gateway session id
    pub session_id: String,
    pub site_key: String,
    pub status: CheckoutStatus,
    pub settlement_style: SettlementStyle,
    pub checkout_url: String,
    pub items: Vec<CheckoutLine>,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub grand_total: i64,
    pub platform_fee: i64,
    pub fee_rate: Decimal,
    pub currency: String,
    /// Display locale sent to the gateway
    pub locale: String,
    /// Canonical language used for pricing and names
    pub language: String,
    /// Language tag as the buyer sent it
    pub ui_language: Option<String>,
    pub sub_account_id: String,
    pub transfer_group: String,
    pub free_shipping: bool,
    pub free_shipping_threshold: i64,
    pub free_shipping_by_threshold: bool,
    #[serde(default)]
    pub idempotency_key_hash: Option<String>,
    /// Digest of the normalized request; set together with `idempotency_key_hash`
    #[serde(default)]
    pub request_fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAddress {
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<CustomerAddress>,
}

/// Authoritative order written after the gateway confirms payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedOrder {
    pub id: Uuid,
    pub session_id: String,
    pub event_id: Option<String>,
    pub site_key: Option<String>,
    pub status: OrderStatus,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
    pub customer: CustomerDetails,
    pub items: Vec<OrderItem>,
    pub transfer_group: Option<String>,
    pub sub_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
