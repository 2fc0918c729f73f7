// Language handling
pub mod fallback;
pub mod locale;
pub mod localization;

// Pricing and settlement
pub mod pricing;
pub mod settlement;
pub mod shipping;

// Request gating
pub mod origin;

// Orchestration
pub mod checkout;
pub mod finalizer;

pub use checkout::{CheckoutService, CheckoutSessionCreated, CreateCheckoutRequest};
pub use finalizer::{FinalizeOutcome, OrderFinalizer};
