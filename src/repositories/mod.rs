use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::models::{
    FinalizedOrder, MerchantAccount, PendingCheckout, ProductOffering, ShippingPolicy,
    ShippingPriceTable,
};

pub mod checkout_repository;
pub mod memory;

pub use checkout_repository::SeaOrmCheckoutRepository;
pub use memory::InMemoryRepository;

/// Document store consumed by the checkout pipeline.
///
/// Catalog, merchant and shipping documents are read-only here; pending checkouts and
/// finalized orders are append-only.
#[async_trait]
pub trait CheckoutRepository: Send + Sync {
    async fn merchant_account(&self, site_key: &str)
        -> Result<Option<MerchantAccount>, ServiceError>;

    /// Offerings of `site_key` among `ids`; unknown ids are absent from the result.
    async fn products_by_ids(
        &self,
        site_key: &str,
        ids: &[String],
    ) -> Result<Vec<ProductOffering>, ServiceError>;

    async fn shipping_price_table(
        &self,
        doc_id: &str,
    ) -> Result<Option<ShippingPriceTable>, ServiceError>;

    async fn shipping_policy(&self, doc_id: &str) -> Result<Option<ShippingPolicy>, ServiceError>;

    async fn insert_pending_checkout(&self, checkout: &PendingCheckout)
        -> Result<(), ServiceError>;

    async fn pending_checkout(
        &self,
        session_id: &str,
    ) -> Result<Option<PendingCheckout>, ServiceError>;

    async fn pending_checkout_by_idempotency_key(
        &self,
        site_key: &str,
        key_hash: &str,
    ) -> Result<Option<PendingCheckout>, ServiceError>;

    async fn insert_finalized_order(&self, order: &FinalizedOrder) -> Result<(), ServiceError>;

    async fn finalized_orders_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<FinalizedOrder>, ServiceError>;
}

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
