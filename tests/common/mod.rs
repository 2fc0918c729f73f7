#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use marketplace_checkout::{
    app_router,
    config::{AppConfig, FinalizationMode},
    gateway::InMemoryGateway,
    handlers::AppServices,
    models::{LocalizedText, MerchantAccount, ProductOffering, TranslationRow},
    repositories::InMemoryRepository,
    webhooks::SignatureGenerator,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub const SITE: &str = "shop-42";
pub const SUB_ACCOUNT: &str = "acct_1Seller42";
pub const STOREFRONT: &str = "https://shop-42.pageit.jp";
pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";

/// Helper harness running the full router over in-memory storage and gateway.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub repository: Arc<InMemoryRepository>,
    pub gateway: Arc<InMemoryGateway>,
}

impl TestApp {
    /// Construct a new test application with the default settings.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_finalization_mode(mode: FinalizationMode) -> Self {
        Self::with_config(|cfg| cfg.checkout.finalization_mode = mode).await
    }

    /// Construct a test application after adjusting the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.storage_backend = "in-memory".to_string();
        cfg.gateway.provider = "in-memory".to_string();
        cfg.gateway.webhook_secret = Some(WEBHOOK_SECRET.to_string());
        adjust(&mut cfg);

        let repository = Arc::new(InMemoryRepository::new());
        let gateway = Arc::new(InMemoryGateway::new());
        let services = AppServices::new(repository.clone(), gateway.clone(), &cfg)
            .expect("origin patterns compile");

        let state = AppState {
            config: Arc::new(cfg),
            services,
            db: None,
        };
        let router = app_router(state.clone());

        Self {
            router,
            state,
            repository,
            gateway,
        }
    }

    /// Seeds a connected merchant for [`SITE`].
    pub async fn seed_merchant(&self) {
        self.repository
            .put_merchant_account(MerchantAccount {
                site_key: SITE.to_string(),
                sub_account_id: Some(SUB_ACCOUNT.to_string()),
                onboarding_completed: true,
                sales_suspended: false,
            })
            .await;
    }

    pub async fn seed_product(&self, id: &str, title: &str, price: Option<i64>) {
        self.seed_translated_product(id, title, &[], price).await;
    }

    pub async fn seed_translated_product(
        &self,
        id: &str,
        title: &str,
        translations: &[(&str, &str)],
        price: Option<i64>,
    ) {
        self.repository
            .put_product(ProductOffering {
                site_key: SITE.to_string(),
                id: id.to_string(),
                base: LocalizedText {
                    title: title.to_string(),
                    body: String::new(),
                },
                translations: translations
                    .iter()
                    .map(|(code, title)| TranslationRow {
                        language_code: code.to_string(),
                        title: title.to_string(),
                        body: String::new(),
                    })
                    .collect(),
                source_language: None,
                price_tax_included: price,
            })
            .await;
    }

    /// Send a request with an optional raw body and extra headers.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Vec<u8>>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// POST a JSON body to a checkout endpoint from the storefront origin.
    pub async fn post_checkout(&self, path: &str, payload: &Value) -> Response {
        self.send(
            Method::POST,
            path,
            Some(serde_json::to_vec(payload).expect("json")),
            &[("origin", STOREFRONT)],
        )
        .await
    }

    /// POST a webhook body signed with the configured secret.
    pub async fn post_signed_webhook(&self, payload: &Value) -> Response {
        let body = serde_json::to_vec(payload).expect("json");
        let signature = SignatureGenerator::new(WEBHOOK_SECRET)
            .header_value(Utc::now().timestamp(), &body)
            .expect("signature");
        self.send(
            Method::POST,
            "/api/v1/payments/webhook",
            Some(body),
            &[("stripe-signature", signature.as_str())],
        )
        .await
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
