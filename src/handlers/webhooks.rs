use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError, services::finalizer::FinalizeOutcome, webhooks::SIGNATURE_HEADER,
    AppState,
};

/// Acknowledgement returned to the gateway
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    /// "created", "already_finalized" or "ignored"
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl From<&FinalizeOutcome> for WebhookAck {
    fn from(outcome: &FinalizeOutcome) -> Self {
        let (label, order_id) = match outcome {
            FinalizeOutcome::Created(order) => ("created", Some(order.id.to_string())),
            FinalizeOutcome::AlreadyFinalized { .. } => ("already_finalized", None),
            FinalizeOutcome::Ignored { .. } => ("ignored", None),
        };
        Self {
            received: true,
            outcome: label.to_string(),
            order_id,
        }
    }
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/payments/webhook", post(payment_webhook))
}

// POST /api/v1/payments/webhook
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body(content = String, description = "Raw event body exactly as signed"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix seconds>,v1=<hex HMAC-SHA256>")
    ),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Missing or invalid signature, or unreadable payload", body = crate::errors::ErrorResponse),
        (status = 500, description = "Order could not be stored; the gateway retries", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = state.services.finalizer.handle(&body, signature).await?;
    Ok(Json(WebhookAck::from(&outcome)))
}
