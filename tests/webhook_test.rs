//! HTTP-level tests for the payment webhook.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, SITE, SUB_ACCOUNT, WEBHOOK_SECRET};
use marketplace_checkout::config::FinalizationMode;
use marketplace_checkout::webhooks::SignatureGenerator;
use serde_json::{json, Value};

const WEBHOOK: &str = "/api/v1/payments/webhook";

fn completed(session_id: &str, metadata: Value) -> Value {
    json!({
        "id": format!("evt_{}", session_id),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "amount_total": 1000,
                "currency": "jpy",
                "payment_status": "paid",
                "customer_details": {
                    "email": "buyer@example.jp",
                    "name": "山田 太郎",
                    "phone": "+81312345678",
                    "address": {
                        "postal_code": "150-0001",
                        "country": "JP",
                        "state": "東京都",
                        "city": "渋谷区",
                        "line1": "神宮前1-1-1",
                        "line2": null
                    }
                },
                "metadata": metadata
            }
        }
    })
}

fn full_metadata() -> Value {
    json!({
        "siteKey": SITE,
        "transferGroup": "grp_shop-42_1714521600000_a1b2c3",
        "sellerConnectId": SUB_ACCOUNT,
        "items": r#"[{"id":"p1","name":"Matcha","qty":2,"unitAmount":500}]"#
    })
}

#[tokio::test]
async fn test_missing_signature_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let body = serde_json::to_vec(&completed("cs_missing", full_metadata())).unwrap();

    let response = app.send(Method::POST, WEBHOOK, Some(body), &[]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], "invalid_signature");
    assert!(app.repository.finalized_orders().await.is_empty());
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let app = TestApp::new().await;
    let body = serde_json::to_vec(&completed("cs_wrong", full_metadata())).unwrap();
    let header = SignatureGenerator::new("whsec_someone_else")
        .header_value(chrono::Utc::now().timestamp(), &body)
        .unwrap();

    let response = app
        .send(
            Method::POST,
            WEBHOOK,
            Some(body),
            &[("stripe-signature", header.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.repository.finalized_orders().await.is_empty());
}

#[tokio::test]
async fn test_stale_timestamp_is_rejected() {
    let app = TestApp::new().await;
    let body = serde_json::to_vec(&completed("cs_stale", full_metadata())).unwrap();
    let header = SignatureGenerator::new(WEBHOOK_SECRET)
        .header_value(chrono::Utc::now().timestamp() - 3_600, &body)
        .unwrap();

    let response = app
        .send(
            Method::POST,
            WEBHOOK,
            Some(body),
            &[("stripe-signature", header.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_completed_session_creates_finalized_order() {
    let app = TestApp::new().await;

    let response = app
        .post_signed_webhook(&completed("cs_paid", full_metadata()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["received"], true);
    assert_eq!(body["outcome"], "created");

    let orders = app.repository.finalized_orders().await;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(body["order_id"], order.id.to_string());
    assert_eq!(order.session_id, "cs_paid");
    assert_eq!(order.site_key.as_deref(), Some(SITE));
    assert_eq!(order.amount, Some(1000));
    assert_eq!(order.currency.as_deref(), Some("jpy"));
    assert_eq!(order.payment_status.as_deref(), Some("paid"));
    assert_eq!(order.sub_account_id.as_deref(), Some(SUB_ACCOUNT));
    assert_eq!(order.customer.email.as_deref(), Some("buyer@example.jp"));
    let address = order.customer.address.as_ref().unwrap();
    assert_eq!(address.postal_code.as_deref(), Some("150-0001"));
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].unit_amount, 500);
}

#[tokio::test]
async fn test_missing_site_key_still_creates_order() {
    let app = TestApp::new().await;

    let response = app
        .post_signed_webhook(&completed("cs_nosite", json!({"siteKey": ""})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let orders = app.repository.finalized_orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].site_key, None);
    assert!(orders[0].items.is_empty());
}

#[tokio::test]
async fn test_large_cart_items_are_recovered_from_pending_checkout() {
    let app = TestApp::new().await;
    app.seed_merchant().await;
    let mut cart = Vec::new();
    for n in 1..=6 {
        let id = format!("p{}", n);
        let title = format!("Hand-whisked ceremonial grade uji matcha tin number {}", n);
        app.seed_product(&id, &title, Some(500)).await;
        cart.push(json!({"id": id, "qty": 1}));
    }

    let response = app
        .post_checkout(
            "/api/v1/checkout/sessions",
            &json!({"siteKey": SITE, "items": cart, "lang": "ja"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sessions = app.gateway.sessions().await;
    let recorded = &sessions[0];
    assert!(!recorded.params.metadata.contains_key("items"));
    let metadata = serde_json::to_value(&recorded.params.metadata).unwrap();

    let response = app
        .post_signed_webhook(&completed(&recorded.session.id, metadata))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let orders = app.repository.finalized_orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].items.len(), 6);
    assert_eq!(orders[0].items[0].id.as_deref(), Some("p1"));
    assert!(orders[0].items.iter().all(|item| item.unit_amount == 500));
}

#[tokio::test]
async fn test_other_event_types_are_acknowledged_without_writes() {
    let app = TestApp::new().await;

    let response = app
        .post_signed_webhook(&json!({
            "id": "evt_refund",
            "type": "charge.refunded",
            "data": {"object": {"id": "ch_1"}}
        }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["outcome"], "ignored");
    assert!(app.repository.finalized_orders().await.is_empty());
}

#[tokio::test]
async fn test_redelivery_inserts_again_by_default() {
    let app = TestApp::new().await;
    let event = completed("cs_twice", full_metadata());

    app.post_signed_webhook(&event).await;
    app.post_signed_webhook(&event).await;

    assert_eq!(app.repository.finalized_orders().await.len(), 2);
}

#[tokio::test]
async fn test_create_if_absent_skips_redelivery() {
    let app = TestApp::with_finalization_mode(FinalizationMode::CreateIfAbsent).await;
    let event = completed("cs_once", full_metadata());

    let first = response_json(app.post_signed_webhook(&event).await).await;
    let second = response_json(app.post_signed_webhook(&event).await).await;

    assert_eq!(first["outcome"], "created");
    assert_eq!(second["outcome"], "already_finalized");
    assert_eq!(app.repository.finalized_orders().await.len(), 1);
}

#[tokio::test]
async fn test_store_failure_returns_server_error() {
    let app = TestApp::new().await;
    app.repository.fail_order_writes(true).await;

    let response = app
        .post_signed_webhook(&completed("cs_down", full_metadata()))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response_json(response).await["message"], "Database error");
}

#[tokio::test]
async fn test_unconfigured_secret_rejects_deliveries() {
    let app = TestApp::with_config(|cfg| cfg.gateway.webhook_secret = None).await;

    let response = app
        .post_signed_webhook(&completed("cs_nosecret", full_metadata()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.repository.finalized_orders().await.is_empty());
}
