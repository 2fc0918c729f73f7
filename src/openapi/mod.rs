use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace Checkout API",
        version = "0.1.0",
        description = r#"
# Marketplace Checkout API

Opens hosted payment sessions for storefronts that sell on behalf of connected sellers, and records
finalized orders from signed gateway notifications.

## Checkout

Storefront pages post a cart to one of the session endpoints and redirect the buyer to the returned
`url`. Browser calls must come from an allow-listed origin. Prices are read from the catalog; the
request carries only product ids and quantities.

Send an `Idempotency-Key` header to make retries safe: a repeat with the same key for the same site
returns the first session's URL and sets `Idempotent-Replayed: true`.

## Webhooks

The gateway posts events to `/api/v1/payments/webhook` with a `Stripe-Signature` header. Unsigned or
mis-signed deliveries are rejected with 400 and have no effect.

## Error Handling

Every error body has the same shape:

```json
{
  "error": "sales_suspended",
  "message": "Sales are suspended for site shop-42",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Checkout", description = "Hosted payment session creation"),
        (name = "Payments", description = "Gateway webhook intake"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::checkout::create_destination_session,
        crate::handlers::webhooks::payment_webhook,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::services::checkout::CreateCheckoutRequest,
            crate::services::checkout::CartItemRequest,
            crate::handlers::checkout::CheckoutSessionResponse,
            crate::handlers::webhooks::WebhookAck,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::ComponentStatus,
            crate::errors::ErrorResponse,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_checkout_and_webhook_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Marketplace Checkout API"));
        assert!(json.contains("/api/v1/checkout/sessions"));
        assert!(json.contains("/api/v1/checkout/destination-sessions"));
        assert!(json.contains("/api/v1/payments/webhook"));
        assert!(json.contains("ErrorResponse"));
    }
}
