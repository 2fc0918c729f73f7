use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::MerchantAccount;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merchant_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub site_key: String,
    pub sub_account_id: Option<String>,
    pub onboarding_completed: bool,
    pub sales_suspended: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for MerchantAccount {
    fn from(model: Model) -> Self {
        Self {
            site_key: model.site_key,
            sub_account_id: model.sub_account_id,
            onboarding_completed: model.onboarding_completed,
            sales_suspended: model.sales_suspended,
        }
    }
}
