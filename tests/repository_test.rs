//! Round trips through the sea-orm repository on an in-memory SQLite database.

use std::sync::Arc;

use chrono::Utc;
use marketplace_checkout::{
    db::{self, DbConfig},
    entities::{merchant_account, product_offering, shipping_policy, shipping_price_table},
    models::{
        CheckoutLine, CheckoutStatus, CustomerDetails, FinalizedOrder, OrderItem, OrderStatus,
        PendingCheckout, SettlementStyle,
    },
    repositories::{CheckoutRepository, SeaOrmCheckoutRepository},
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::json;
use uuid::Uuid;

async fn setup() -> (Arc<DatabaseConnection>, SeaOrmCheckoutRepository) {
    let pool = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("sqlite connection");
    db::run_migrations(&pool).await.expect("migrations");

    let pool = Arc::new(pool);
    let repository = SeaOrmCheckoutRepository::new(pool.clone());
    (pool, repository)
}

fn pending(session_id: &str, key_hash: Option<&str>) -> PendingCheckout {
    PendingCheckout {
        session_id: session_id.to_string(),
        site_key: "shop-42".to_string(),
        status: CheckoutStatus::Pending,
        settlement_style: SettlementStyle::SeparateChargesAndTransfers,
        checkout_url: format!("https://pay.example/{}", session_id),
        items: vec![CheckoutLine {
            product_id: "p1".to_string(),
            name: "Matcha".to_string(),
            quantity: 2,
            unit_amount: 500,
            line_total: 1000,
        }],
        subtotal: 1000,
        shipping_fee: 0,
        grand_total: 1000,
        platform_fee: 70,
        fee_rate: dec!(0.07),
        currency: "jpy".to_string(),
        locale: "ja".to_string(),
        language: "ja".to_string(),
        ui_language: Some("ja-JP".to_string()),
        sub_account_id: "acct_1Seller42".to_string(),
        transfer_group: "grp_shop-42_1714521600000_a1b2c3".to_string(),
        free_shipping: true,
        free_shipping_threshold: 0,
        free_shipping_by_threshold: false,
        idempotency_key_hash: key_hash.map(str::to_string),
        request_fingerprint: key_hash.map(|h| format!("fp-{}", h)),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_catalog_documents_are_mapped_to_domain_types() {
    let (pool, repository) = setup().await;

    merchant_account::ActiveModel {
        site_key: Set("shop-42".to_string()),
        sub_account_id: Set(Some("acct_1Seller42".to_string())),
        onboarding_completed: Set(true),
        sales_suspended: Set(false),
    }
    .insert(pool.as_ref())
    .await
    .unwrap();

    for (id, price) in [("p1", Some(500)), ("p2", None)] {
        product_offering::ActiveModel {
            site_key: Set("shop-42".to_string()),
            id: Set(id.to_string()),
            title: Set("抹茶".to_string()),
            body: Set(String::new()),
            translations: Set(json!([
                {"language_code": "en", "title": "Matcha", "body": ""}
            ])),
            source_language: Set(Some("ja".to_string())),
            price_tax_included: Set(price),
        }
        .insert(pool.as_ref())
        .await
        .unwrap();
    }

    shipping_price_table::ActiveModel {
        doc_id: Set("shop-42".to_string()),
        prices: Set(json!({"ja": 800, "en": 1200})),
    }
    .insert(pool.as_ref())
    .await
    .unwrap();

    shipping_policy::ActiveModel {
        doc_id: Set("shop-42".to_string()),
        enabled: Set(true),
        threshold_by_language: Set(json!({"ja": 5000})),
        default_threshold: Set(Some(10_000)),
    }
    .insert(pool.as_ref())
    .await
    .unwrap();

    let merchant = repository.merchant_account("shop-42").await.unwrap().unwrap();
    assert_eq!(merchant.sub_account_id.as_deref(), Some("acct_1Seller42"));
    assert!(merchant.onboarding_completed);
    assert!(repository.merchant_account("missing").await.unwrap().is_none());

    let mut products = repository
        .products_by_ids(
            "shop-42",
            &["p1".to_string(), "p2".to_string(), "ghost".to_string()],
        )
        .await
        .unwrap();
    products.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].price_tax_included, Some(500));
    assert_eq!(products[0].translations[0].language_code, "en");
    assert_eq!(products[0].source_language.as_deref(), Some("ja"));
    assert_eq!(products[1].price_tax_included, None);

    let other_site = repository
        .products_by_ids("shop-7", &["p1".to_string()])
        .await
        .unwrap();
    assert!(other_site.is_empty());

    let table = repository
        .shipping_price_table("shop-42")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(table.prices.get("en"), Some(&1200));

    let policy = repository.shipping_policy("shop-42").await.unwrap().unwrap();
    assert!(policy.enabled);
    assert_eq!(policy.threshold_by_language.get("ja"), Some(&5000));
    assert_eq!(policy.default_threshold, Some(10_000));
}

#[tokio::test]
async fn test_pending_checkout_round_trip_and_key_lookup() {
    let (_pool, repository) = setup().await;
    let checkout = pending("cs_round_trip", Some("abc123"));

    repository.insert_pending_checkout(&checkout).await.unwrap();

    let stored = repository
        .pending_checkout("cs_round_trip")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.items, checkout.items);
    assert_eq!(stored.grand_total, 1000);
    assert_eq!(stored.platform_fee, 70);
    assert_eq!(stored.fee_rate.round_dp(4), dec!(0.07));
    assert_eq!(stored.settlement_style, SettlementStyle::SeparateChargesAndTransfers);
    assert_eq!(stored.ui_language.as_deref(), Some("ja-JP"));

    let replay = repository
        .pending_checkout_by_idempotency_key("shop-42", "abc123")
        .await
        .unwrap();
    assert_eq!(replay.map(|c| c.session_id), Some("cs_round_trip".to_string()));

    let other_site = repository
        .pending_checkout_by_idempotency_key("shop-7", "abc123")
        .await
        .unwrap();
    assert!(other_site.is_none());
}

#[tokio::test]
async fn test_finalized_orders_are_append_only() {
    let (_pool, repository) = setup().await;

    for event in ["evt_1", "evt_2"] {
        let order = FinalizedOrder {
            id: Uuid::new_v4(),
            session_id: "cs_paid".to_string(),
            event_id: Some(event.to_string()),
            site_key: None,
            status: OrderStatus::Paid,
            amount: Some(1000),
            currency: Some("jpy".to_string()),
            payment_status: Some("paid".to_string()),
            customer: CustomerDetails {
                email: Some("buyer@example.jp".to_string()),
                ..Default::default()
            },
            items: vec![OrderItem {
                id: Some("p1".to_string()),
                name: "Matcha".to_string(),
                qty: 2,
                unit_amount: 500,
            }],
            transfer_group: None,
            sub_account_id: None,
            created_at: Utc::now(),
        };
        repository.insert_finalized_order(&order).await.unwrap();
    }

    let orders = repository
        .finalized_orders_for_session("cs_paid")
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o.site_key.is_none()));
    assert_eq!(orders[0].customer.email.as_deref(), Some("buyer@example.jp"));
    assert_eq!(orders[0].items[0].qty, 2);

    assert!(repository
        .finalized_orders_for_session("cs_other")
        .await
        .unwrap()
        .is_empty());
}
