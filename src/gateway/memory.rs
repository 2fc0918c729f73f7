use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{CheckoutSessionParams, GatewayError, GatewaySession, PaymentGateway};

const CHECKOUT_BASE_URL: &str = "https://checkout.local.test/pay";
const KEY_REUSE_MESSAGE: &str =
    "Keys for idempotent requests can only be used with the same parameters they were first used with.";

/// A request the in-memory gateway received.
#[derive(Debug, Clone)]
pub struct RecordedSession {
    pub session: GatewaySession,
    pub params: CheckoutSessionParams,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    sessions: Vec<RecordedSession>,
    failure: Option<String>,
    /// First request and session per idempotency key
    keyed: HashMap<String, (CheckoutSessionParams, GatewaySession)>,
}

/// Gateway stand-in for local development and tests.
///
/// Unkeyed calls always open a new session. A repeated idempotency key returns the first
/// session when the parameters match and fails when they differ.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following call fail with `message` until cleared.
    pub async fn fail_with(&self, message: impl Into<String>) {
        self.state.lock().await.failure = Some(message.into());
    }

    pub async fn clear_failure(&self) {
        self.state.lock().await.failure = None;
    }

    pub async fn sessions(&self) -> Vec<RecordedSession> {
        self.state.lock().await.sessions.clone()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
        idempotency_key: Option<&str>,
    ) -> Result<GatewaySession, GatewayError> {
        let mut state = self.state.lock().await;
        if let Some(message) = state.failure.clone() {
            return Err(GatewayError::Api {
                status: 400,
                message,
            });
        }

        let keyed = idempotency_key.and_then(|key| state.keyed.get(key)).cloned();
        let session = match keyed {
            Some((first_params, _)) if first_params != *params => {
                return Err(GatewayError::Api {
                    status: 400,
                    message: KEY_REUSE_MESSAGE.to_string(),
                });
            }
            Some((_, session)) => session,
            None => {
                let id = format!("cs_test_{}", Uuid::new_v4().simple());
                let session = GatewaySession {
                    url: format!("{}/{}", CHECKOUT_BASE_URL, id),
                    id,
                };
                if let Some(key) = idempotency_key {
                    state
                        .keyed
                        .insert(key.to_string(), (params.clone(), session.clone()));
                }
                debug!(session_id = %session.id, "In-memory checkout session opened");
                session
            }
        };

        state.sessions.push(RecordedSession {
            session: session.clone(),
            params: params.clone(),
            idempotency_key: idempotency_key.map(str::to_string),
        });
        Ok(session)
    }
}
