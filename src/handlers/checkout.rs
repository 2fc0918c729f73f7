use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    models::SettlementStyle,
    services::{
        checkout::CreateCheckoutRequest,
        origin::{cors_headers, preflight_headers},
    },
    AppState,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
pub const IDEMPOTENT_REPLAY_HEADER: &str = "idempotent-replayed";

/// Hosted payment page the buyer is redirected to
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSessionResponse {
    #[schema(example = "https://checkout.stripe.com/c/pay/cs_test_a1b2c3")]
    pub url: String,
}

/// Creates the router for checkout session endpoints
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            post(create_checkout_session).options(checkout_preflight),
        )
        .route(
            "/destination-sessions",
            post(create_destination_session).options(checkout_preflight),
        )
}

/// Open a hosted payment session settled by a later transfer to the seller
#[utoipa::path(
    post,
    path = "/api/v1/checkout/sessions",
    request_body = CreateCheckoutRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Replays the first session created with this key")
    ),
    responses(
        (status = 200, description = "Session created", body = CheckoutSessionResponse),
        (status = 400, description = "Invalid request, no purchasable items or merchant not connected", body = crate::errors::ErrorResponse),
        (status = 403, description = "Origin not allowed or sales suspended", body = crate::errors::ErrorResponse),
        (status = 409, description = "Idempotency-Key already used with a different request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Gateway or storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    open_session(&state, &headers, &body, SettlementStyle::SeparateChargesAndTransfers).await
}

/// Open a hosted payment session routed to the seller with the platform fee deducted inline
#[utoipa::path(
    post,
    path = "/api/v1/checkout/destination-sessions",
    request_body = CreateCheckoutRequest,
    params(
        ("Idempotency-Key" = Option<String>, Header, description = "Replays the first session created with this key")
    ),
    responses(
        (status = 200, description = "Session created", body = CheckoutSessionResponse),
        (status = 400, description = "Invalid request, no purchasable items or onboarding incomplete", body = crate::errors::ErrorResponse),
        (status = 403, description = "Origin not allowed or sales suspended", body = crate::errors::ErrorResponse),
        (status = 409, description = "Idempotency-Key already used with a different request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Gateway or storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_destination_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    open_session(&state, &headers, &body, SettlementStyle::Destination).await
}

/// CORS preflight for both session endpoints; disallowed origins get no CORS grant
pub async fn checkout_preflight(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let origin = header_str(&headers, header::ORIGIN.as_str());
    match state.services.checkout.origins().check(origin) {
        Ok(()) => (StatusCode::NO_CONTENT, preflight_headers(origin)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn open_session(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    style: SettlementStyle,
) -> Response {
    let origin = header_str(headers, header::ORIGIN.as_str());
    let checkout = &state.services.checkout;

    let cors = cors_headers(origin);
    if let Err(err) = checkout.origins().check(origin) {
        return (cors, err).into_response();
    }

    let request: CreateCheckoutRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            let err = ServiceError::ValidationError(format!("Invalid JSON: {}", e));
            return (cors, err).into_response();
        }
    };
    let idempotency_key = header_str(headers, IDEMPOTENCY_KEY_HEADER);

    match checkout
        .create_session(request, style, origin, idempotency_key)
        .await
    {
        Ok(created) => {
            let mut response_headers = cors;
            if created.replayed {
                response_headers.insert(
                    HeaderName::from_static(IDEMPOTENT_REPLAY_HEADER),
                    HeaderValue::from_static("true"),
                );
            }
            (
                StatusCode::OK,
                response_headers,
                Json(CheckoutSessionResponse {
                    url: created.url().to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => (cors, err).into_response(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
