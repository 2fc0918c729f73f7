use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{FinalizedOrder, OrderStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "finalized_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: String,
    pub event_id: Option<String>,
    pub site_key: Option<String>,
    pub status: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub payment_status: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub customer: Json,
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    pub transfer_group: Option<String>,
    pub sub_account_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&FinalizedOrder> for ActiveModel {
    type Error = ServiceError;

    fn try_from(order: &FinalizedOrder) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Set(order.id),
            session_id: Set(order.session_id.clone()),
            event_id: Set(order.event_id.clone()),
            site_key: Set(order.site_key.clone()),
            status: Set(order.status.to_string()),
            amount: Set(order.amount),
            currency: Set(order.currency.clone()),
            payment_status: Set(order.payment_status.clone()),
            customer: Set(serde_json::to_value(&order.customer)?),
            items: Set(serde_json::to_value(&order.items)?),
            transfer_group: Set(order.transfer_group.clone()),
            sub_account_id: Set(order.sub_account_id.clone()),
            created_at: Set(order.created_at),
        })
    }
}

impl TryFrom<Model> for FinalizedOrder {
    type Error = ServiceError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let status = OrderStatus::from_str(&model.status).map_err(|_| {
            ServiceError::InternalError(format!("unknown order status '{}'", model.status))
        })?;
        Ok(Self {
            id: model.id,
            session_id: model.session_id,
            event_id: model.event_id,
            site_key: model.site_key,
            status,
            amount: model.amount,
            currency: model.currency,
            payment_status: model.payment_status,
            customer: serde_json::from_value(model.customer)?,
            items: serde_json::from_value(model.items)?,
            transfer_group: model.transfer_group,
            sub_account_id: model.sub_account_id,
            created_at: model.created_at,
        })
    }
}
