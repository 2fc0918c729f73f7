use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CheckoutRepository;
use crate::errors::ServiceError;
use crate::models::{
    FinalizedOrder, MerchantAccount, PendingCheckout, ProductOffering, ShippingPolicy,
    ShippingPriceTable,
};

#[derive(Debug, Default)]
struct Collections {
    merchants: HashMap<String, MerchantAccount>,
    /// Keyed by (site_key, product id)
    products: HashMap<(String, String), ProductOffering>,
    price_tables: HashMap<String, ShippingPriceTable>,
    policies: HashMap<String, ShippingPolicy>,
    pending: HashMap<String, PendingCheckout>,
    finalized: Vec<FinalizedOrder>,
    fail_pending_writes: bool,
    fail_order_writes: bool,
}

/// Process-local store used by tests and `storage_backend = "in-memory"`.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    inner: RwLock<Collections>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_merchant_account(&self, account: MerchantAccount) {
        self.inner
            .write()
            .await
            .merchants
            .insert(account.site_key.clone(), account);
    }

    pub async fn put_product(&self, product: ProductOffering) {
        self.inner
            .write()
            .await
            .products
            .insert((product.site_key.clone(), product.id.clone()), product);
    }

    pub async fn put_shipping_price_table(&self, table: ShippingPriceTable) {
        self.inner
            .write()
            .await
            .price_tables
            .insert(table.doc_id.clone(), table);
    }

    pub async fn put_shipping_policy(&self, policy: ShippingPolicy) {
        self.inner
            .write()
            .await
            .policies
            .insert(policy.doc_id.clone(), policy);
    }

    /// Makes pending-checkout writes fail, leaving opened sessions orphaned.
    pub async fn fail_pending_writes(&self, fail: bool) {
        self.inner.write().await.fail_pending_writes = fail;
    }

    pub async fn fail_order_writes(&self, fail: bool) {
        self.inner.write().await.fail_order_writes = fail;
    }

    pub async fn pending_checkouts(&self) -> Vec<PendingCheckout> {
        self.inner.read().await.pending.values().cloned().collect()
    }

    pub async fn finalized_orders(&self) -> Vec<FinalizedOrder> {
        self.inner.read().await.finalized.clone()
    }
}

fn unavailable(collection: &str) -> ServiceError {
    ServiceError::DatabaseError(sea_orm::DbErr::Custom(format!(
        "{} store unavailable",
        collection
    )))
}

#[async_trait]
impl CheckoutRepository for InMemoryRepository {
    async fn merchant_account(
        &self,
        site_key: &str,
    ) -> Result<Option<MerchantAccount>, ServiceError> {
        Ok(self.inner.read().await.merchants.get(site_key).cloned())
    }

    async fn products_by_ids(
        &self,
        site_key: &str,
        ids: &[String],
    ) -> Result<Vec<ProductOffering>, ServiceError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.products.get(&(site_key.to_string(), id.clone())))
            .cloned()
            .collect())
    }

    async fn shipping_price_table(
        &self,
        doc_id: &str,
    ) -> Result<Option<ShippingPriceTable>, ServiceError> {
        Ok(self.inner.read().await.price_tables.get(doc_id).cloned())
    }

    async fn shipping_policy(&self, doc_id: &str) -> Result<Option<ShippingPolicy>, ServiceError> {
        Ok(self.inner.read().await.policies.get(doc_id).cloned())
    }

    async fn insert_pending_checkout(
        &self,
        checkout: &PendingCheckout,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.write().await;
        if inner.fail_pending_writes {
            return Err(unavailable("pending checkout"));
        }
        if inner.pending.contains_key(&checkout.session_id) {
            return Err(ServiceError::DatabaseError(sea_orm::DbErr::RecordNotInserted));
        }
        inner
            .pending
            .insert(checkout.session_id.clone(), checkout.clone());
        Ok(())
    }

    async fn pending_checkout(
        &self,
        session_id: &str,
    ) -> Result<Option<PendingCheckout>, ServiceError> {
        Ok(self.inner.read().await.pending.get(session_id).cloned())
    }

    async fn pending_checkout_by_idempotency_key(
        &self,
        site_key: &str,
        key_hash: &str,
    ) -> Result<Option<PendingCheckout>, ServiceError> {
        Ok(self
            .inner
            .read()
            .await
            .pending
            .values()
            .find(|c| c.site_key == site_key && c.idempotency_key_hash.as_deref() == Some(key_hash))
            .cloned())
    }

    async fn insert_finalized_order(&self, order: &FinalizedOrder) -> Result<(), ServiceError> {
        let mut inner = self.inner.write().await;
        if inner.fail_order_writes {
            return Err(unavailable("finalized order"));
        }
        inner.finalized.push(order.clone());
        Ok(())
    }

    async fn finalized_orders_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<FinalizedOrder>, ServiceError> {
        Ok(self
            .inner
            .read()
            .await
            .finalized
            .iter()
            .filter(|o| o.session_id == session_id)
            .cloned()
            .collect())
    }
}
