use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use tracing::instrument;

use super::{BaseRepository, CheckoutRepository, Repository};
use crate::entities::{
    finalized_order, merchant_account, pending_checkout, product_offering, shipping_policy,
    shipping_price_table,
};
use crate::errors::ServiceError;
use crate::models::{
    FinalizedOrder, MerchantAccount, PendingCheckout, ProductOffering, ShippingPolicy,
    ShippingPriceTable,
};

/// Relational document store backed by sea-orm
#[derive(Debug, Clone)]
pub struct SeaOrmCheckoutRepository {
    base: BaseRepository,
}

impl SeaOrmCheckoutRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl CheckoutRepository for SeaOrmCheckoutRepository {
    async fn merchant_account(
        &self,
        site_key: &str,
    ) -> Result<Option<MerchantAccount>, ServiceError> {
        Ok(merchant_account::Entity::find_by_id(site_key.to_string())
            .one(self.base.get_db())
            .await?
            .map(MerchantAccount::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn products_by_ids(
        &self,
        site_key: &str,
        ids: &[String],
    ) -> Result<Vec<ProductOffering>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        product_offering::Entity::find()
            .filter(product_offering::Column::SiteKey.eq(site_key))
            .filter(product_offering::Column::Id.is_in(ids.iter().cloned()))
            .all(self.base.get_db())
            .await?
            .into_iter()
            .map(|model| ProductOffering::try_from(model).map_err(ServiceError::from))
            .collect()
    }

    async fn shipping_price_table(
        &self,
        doc_id: &str,
    ) -> Result<Option<ShippingPriceTable>, ServiceError> {
        shipping_price_table::Entity::find_by_id(doc_id.to_string())
            .one(self.base.get_db())
            .await?
            .map(|model| ShippingPriceTable::try_from(model).map_err(ServiceError::from))
            .transpose()
    }

    async fn shipping_policy(&self, doc_id: &str) -> Result<Option<ShippingPolicy>, ServiceError> {
        shipping_policy::Entity::find_by_id(doc_id.to_string())
            .one(self.base.get_db())
            .await?
            .map(|model| ShippingPolicy::try_from(model).map_err(ServiceError::from))
            .transpose()
    }

    #[instrument(skip(self, checkout), fields(session_id = %checkout.session_id))]
    async fn insert_pending_checkout(
        &self,
        checkout: &PendingCheckout,
    ) -> Result<(), ServiceError> {
        let active = pending_checkout::ActiveModel::try_from(checkout)?;
        active.insert(self.base.get_db()).await?;
        Ok(())
    }

    async fn pending_checkout(
        &self,
        session_id: &str,
    ) -> Result<Option<PendingCheckout>, ServiceError> {
        pending_checkout::Entity::find_by_id(session_id.to_string())
            .one(self.base.get_db())
            .await?
            .map(PendingCheckout::try_from)
            .transpose()
    }

    async fn pending_checkout_by_idempotency_key(
        &self,
        site_key: &str,
        key_hash: &str,
    ) -> Result<Option<PendingCheckout>, ServiceError> {
        pending_checkout::Entity::find()
            .filter(pending_checkout::Column::SiteKey.eq(site_key))
            .filter(pending_checkout::Column::IdempotencyKeyHash.eq(key_hash))
            .order_by_asc(pending_checkout::Column::CreatedAt)
            .one(self.base.get_db())
            .await?
            .map(PendingCheckout::try_from)
            .transpose()
    }

    #[instrument(skip(self, order), fields(session_id = %order.session_id))]
    async fn insert_finalized_order(&self, order: &FinalizedOrder) -> Result<(), ServiceError> {
        let active = finalized_order::ActiveModel::try_from(order)?;
        active.insert(self.base.get_db()).await?;
        Ok(())
    }

    async fn finalized_orders_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<FinalizedOrder>, ServiceError> {
        finalized_order::Entity::find()
            .filter(finalized_order::Column::SessionId.eq(session_id))
            .order_by_asc(finalized_order::Column::CreatedAt)
            .all(self.base.get_db())
            .await?
            .into_iter()
            .map(FinalizedOrder::try_from)
            .collect()
    }
}
