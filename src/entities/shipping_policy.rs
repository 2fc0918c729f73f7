use std::collections::HashMap;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::ShippingPolicy;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipping_policies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub doc_id: String,
    pub enabled: bool,
    #[sea_orm(column_type = "Json")]
    pub threshold_by_language: Json,
    pub default_threshold: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ShippingPolicy {
    type Error = serde_json::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let threshold_by_language: HashMap<String, i64> = if model.threshold_by_language.is_null()
        {
            HashMap::new()
        } else {
            serde_json::from_value(model.threshold_by_language)?
        };
        Ok(Self {
            doc_id: model.doc_id,
            enabled: model.enabled,
            threshold_by_language,
            default_threshold: model.default_threshold,
        })
    }
}
