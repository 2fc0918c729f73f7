use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{LocalizedText, ProductOffering, TranslationRow};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_offerings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub site_key: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub body: String,
    /// `[{language_code, title, body}]`
    #[sea_orm(column_type = "Json")]
    pub translations: Json,
    pub source_language: Option<String>,
    pub price_tax_included: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ProductOffering {
    type Error = serde_json::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let translations: Vec<TranslationRow> = if model.translations.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(model.translations)?
        };
        Ok(Self {
            site_key: model.site_key,
            id: model.id,
            base: LocalizedText {
                title: model.title,
                body: model.body,
            },
            translations,
            source_language: model.source_language,
            price_tax_included: model.price_tax_included,
        })
    }
}
