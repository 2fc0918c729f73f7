use std::collections::HashMap;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::ShippingPriceTable;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_price_tables")]
pub struct Model {
    /// Site key or the shared default id
    #[sea_orm(primary_key, auto_increment = false)]
    pub doc_id: String,
    /// Canonical language code -> fee
    #[sea_orm(column_type = "Json")]
    pub prices: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ShippingPriceTable {
    type Error = serde_json::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let prices: HashMap<String, i64> = if model.prices.is_null() {
            HashMap::new()
        } else {
            serde_json::from_value(model.prices)?
        };
        Ok(Self {
            doc_id: model.doc_id,
            prices,
        })
    }
}
