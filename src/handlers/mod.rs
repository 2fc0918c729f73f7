pub mod checkout;
pub mod health;
pub mod webhooks;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::PaymentGateway;
use crate::repositories::CheckoutRepository;
use crate::services::{origin::OriginPolicy, CheckoutService, OrderFinalizer};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub finalizer: Arc<OrderFinalizer>,
}

impl AppServices {
    /// Wires both services over one repository and gateway.
    pub fn new(
        repository: Arc<dyn CheckoutRepository>,
        gateway: Arc<dyn PaymentGateway>,
        config: &AppConfig,
    ) -> Result<Self, regex::Error> {
        let origins = OriginPolicy::new(&config.checkout, config.is_production())?;
        let checkout = Arc::new(CheckoutService::new(
            repository.clone(),
            gateway,
            origins,
            config,
        ));
        let finalizer = Arc::new(OrderFinalizer::from_config(repository, config));

        Ok(Self {
            checkout,
            finalizer,
        })
    }
}
