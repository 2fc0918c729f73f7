use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::models::{CheckoutStatus, PendingCheckout, SettlementStyle};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_checkouts")]
pub struct Model {
    /// Gateway session id
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: String,
    pub site_key: String,
    pub status: String,
    pub settlement_style: String,
    pub checkout_url: String,
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub grand_total: i64,
    pub platform_fee: i64,
    pub fee_rate: Decimal,
    pub currency: String,
    pub locale: String,
    pub language: String,
    pub ui_language: Option<String>,
    pub sub_account_id: String,
    pub transfer_group: String,
    pub free_shipping: bool,
    pub free_shipping_threshold: i64,
    pub free_shipping_by_threshold: bool,
    pub idempotency_key_hash: Option<String>,
    pub request_fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&PendingCheckout> for ActiveModel {
    type Error = ServiceError;

    fn try_from(checkout: &PendingCheckout) -> Result<Self, Self::Error> {
        Ok(Self {
            session_id: Set(checkout.session_id.clone()),
            site_key: Set(checkout.site_key.clone()),
            status: Set(checkout.status.to_string()),
            settlement_style: Set(checkout.settlement_style.to_string()),
            checkout_url: Set(checkout.checkout_url.clone()),
            items: Set(serde_json::to_value(&checkout.items)?),
            subtotal: Set(checkout.subtotal),
            shipping_fee: Set(checkout.shipping_fee),
            grand_total: Set(checkout.grand_total),
            platform_fee: Set(checkout.platform_fee),
            fee_rate: Set(checkout.fee_rate),
            currency: Set(checkout.currency.clone()),
            locale: Set(checkout.locale.clone()),
            language: Set(checkout.language.clone()),
            ui_language: Set(checkout.ui_language.clone()),
            sub_account_id: Set(checkout.sub_account_id.clone()),
            transfer_group: Set(checkout.transfer_group.clone()),
            free_shipping: Set(checkout.free_shipping),
            free_shipping_threshold: Set(checkout.free_shipping_threshold),
            free_shipping_by_threshold: Set(checkout.free_shipping_by_threshold),
            idempotency_key_hash: Set(checkout.idempotency_key_hash.clone()),
            request_fingerprint: Set(checkout.request_fingerprint.clone()),
            created_at: Set(checkout.created_at),
        })
    }
}

impl TryFrom<Model> for PendingCheckout {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = CheckoutStatus::from_str(&model.status).map_err(|_| {
            ServiceError::InternalError(format!("unknown checkout status '{}'", model.status))
        })?;
        let settlement_style = SettlementStyle::from_str(&model.settlement_style).map_err(|_| {
            ServiceError::InternalError(format!(
                "unknown settlement style '{}'",
                model.settlement_style
            ))
        })?;

        Ok(Self {
            session_id: model.session_id,
            site_key: model.site_key,
            status,
            settlement_style,
            checkout_url: model.checkout_url,
            items: serde_json::from_value(model.items)?,
            subtotal: model.subtotal,
            shipping_fee: model.shipping_fee,
            grand_total: model.grand_total,
            platform_fee: model.platform_fee,
            fee_rate: model.fee_rate,
            currency: model.currency,
            locale: model.locale,
            language: model.language,
            ui_language: model.ui_language,
            sub_account_id: model.sub_account_id,
            transfer_group: model.transfer_group,
            free_shipping: model.free_shipping,
            free_shipping_threshold: model.free_shipping_threshold,
            free_shipping_by_threshold: model.free_shipping_by_threshold,
            idempotency_key_hash: model.idempotency_key_hash,
            request_fingerprint: model.request_fingerprint,
            created_at: model.created_at,
        })
    }
}
