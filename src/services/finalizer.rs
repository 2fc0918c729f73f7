use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{AppConfig, FinalizationMode};
use crate::errors::ServiceError;
use crate::models::{CustomerDetails, FinalizedOrder, OrderItem, OrderStatus};
use crate::repositories::CheckoutRepository;
use crate::webhooks::{
    verify_signature, CompletedSession, GatewayEvent, SignatureError, CHECKOUT_SESSION_COMPLETED,
};

/// Result of handling one webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Created(FinalizedOrder),
    /// A finalized order already exists for the session and nothing was written
    AlreadyFinalized { session_id: String },
    /// Verified event of a type this service does not act on
    Ignored { event_type: String },
}

/// Turns verified checkout-completed events into finalized orders.
#[derive(Clone)]
pub struct OrderFinalizer {
    repository: Arc<dyn CheckoutRepository>,
    webhook_secret: Option<String>,
    tolerance_secs: u64,
    mode: FinalizationMode,
}

impl OrderFinalizer {
    pub fn new(
        repository: Arc<dyn CheckoutRepository>,
        webhook_secret: Option<String>,
        tolerance_secs: u64,
        mode: FinalizationMode,
    ) -> Self {
        Self {
            repository,
            webhook_secret: webhook_secret.filter(|s| !s.trim().is_empty()),
            tolerance_secs,
            mode,
        }
    }

    pub fn from_config(repository: Arc<dyn CheckoutRepository>, config: &AppConfig) -> Self {
        Self::new(
            repository,
            config.gateway.webhook_secret.clone(),
            config.gateway.webhook_tolerance_secs,
            config.checkout.finalization_mode,
        )
    }

    pub fn mode(&self) -> FinalizationMode {
        self.mode
    }

    /// Verifies the raw body against its signature header and records the order.
    #[instrument(skip(self, payload, signature), fields(payload_len = payload.len()))]
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<FinalizeOutcome, ServiceError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(SignatureError::NotConfigured)?;
        verify_signature(
            payload,
            signature,
            secret,
            self.tolerance_secs,
            Utc::now().timestamp(),
        )
        .map_err(|e| {
            warn!(error = %e, "Rejected webhook delivery");
            ServiceError::from(e)
        })?;

        let event: GatewayEvent = serde_json::from_slice(payload)
            .map_err(|e| ServiceError::ValidationError(format!("invalid event payload: {}", e)))?;

        if event.event_type != CHECKOUT_SESSION_COMPLETED {
            info!(event_type = %event.event_type, "Acknowledged unhandled event type");
            return Ok(FinalizeOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let session: CompletedSession = serde_json::from_value(event.data.object)
            .map_err(|e| ServiceError::ValidationError(format!("invalid session object: {}", e)))?;

        if self.mode == FinalizationMode::CreateIfAbsent {
            let existing = self
                .repository
                .finalized_orders_for_session(&session.id)
                .await?;
            if !existing.is_empty() {
                info!(session_id = %session.id, "Session already finalized; skipping write");
                return Ok(FinalizeOutcome::AlreadyFinalized {
                    session_id: session.id,
                });
            }
        }

        let mut order = build_order(&session, event.id);
        if order.items.is_empty() {
            order.items = self.pending_items(&session.id).await?;
        }
        if let Err(err) = self.repository.insert_finalized_order(&order).await {
            error!(
                session_id = %order.session_id,
                error = %err,
                "Failed to record finalized order; gateway will redeliver"
            );
            return Err(err);
        }

        info!(
            order_id = %order.id,
            session_id = %order.session_id,
            site_key = ?order.site_key,
            amount = ?order.amount,
            "Order finalized"
        );
        Ok(FinalizeOutcome::Created(order))
    }

    /// Line items of the checkout opened for `session_id`, used when metadata had none.
    async fn pending_items(&self, session_id: &str) -> Result<Vec<OrderItem>, ServiceError> {
        match self.repository.pending_checkout(session_id).await? {
            Some(pending) => {
                info!(
                    session_id,
                    item_count = pending.items.len(),
                    "Recovered line items from pending checkout"
                );
                Ok(pending.items.iter().map(OrderItem::from).collect())
            }
            None => {
                warn!(session_id, "No line items in metadata or pending checkout");
                Ok(Vec::new())
            }
        }
    }
}

/// Builds the order from the event alone. Items stay empty when metadata lacks them.
pub fn build_order(session: &CompletedSession, event_id: Option<String>) -> FinalizedOrder {
    let items = match session.metadata_str("items") {
        Some(raw) => serde_json::from_str::<Vec<OrderItem>>(raw).unwrap_or_else(|e| {
            warn!(session_id = %session.id, error = %e, "Unreadable items metadata");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let customer = session
        .customer_details
        .clone()
        .map(|details| CustomerDetails {
            email: details.email,
            name: details.name,
            phone: details.phone,
            address: details.address,
        })
        .unwrap_or_default();

    let owned = |key: &str| session.metadata_str(key).map(str::to_string);

    FinalizedOrder {
        id: Uuid::new_v4(),
        session_id: session.id.clone(),
        event_id,
        site_key: owned("siteKey"),
        status: OrderStatus::Paid,
        amount: session.amount_total,
        currency: session.currency.clone(),
        payment_status: session.payment_status.clone(),
        customer,
        items,
        transfer_group: owned("transferGroup"),
        sub_account_id: owned("sellerConnectId"),
        created_at: Utc::now(),
    }
}
