use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORAGE_BACKEND: &str = "database";
const DEFAULT_GATEWAY_PROVIDER: &str = "stripe";
const DEFAULT_GATEWAY_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Currencies whose smallest unit is a whole unit.
pub const ZERO_DECIMAL_CURRENCIES: [&str; 3] = ["JPY", "KRW", "VND"];

/// Rounding applied when converting between tax-exclusive and tax-inclusive amounts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RoundingPolicy {
    #[default]
    HalfUp,
    Floor,
    Ceil,
}

/// How a completed checkout event is written to the finalized order store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FinalizationMode {
    /// Every verified completion event inserts a new finalized order.
    #[default]
    Insert,
    /// A second event for an already finalized session is acknowledged without a write.
    CreateIfAbsent,
}

/// Payment gateway configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// "stripe" or "in-memory"
    #[serde(default = "default_gateway_provider")]
    #[validate(custom = "validate_gateway_provider")]
    pub provider: String,

    #[serde(default = "default_gateway_api_base")]
    #[validate(length(min = 1))]
    pub api_base: String,

    /// Platform secret key used for outbound session creation
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Shared secret for verifying inbound webhook signatures
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Webhook timestamp tolerance (seconds)
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: u64,

    /// Outbound request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: default_gateway_provider(),
            api_base: default_gateway_api_base(),
            secret_key: None,
            webhook_secret: None,
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Checkout pricing, settlement and origin rules
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    #[serde(default = "default_settlement_currency")]
    #[validate(custom = "validate_settlement_currency")]
    pub settlement_currency: String,

    /// Fee rate for separate charges and transfers
    #[serde(default = "default_platform_fee_rate")]
    #[validate(custom = "validate_fee_rate")]
    pub platform_fee_rate: Decimal,

    /// Fee rate for destination-style settlement
    #[serde(default = "default_destination_fee_rate")]
    #[validate(custom = "validate_fee_rate")]
    pub destination_fee_rate: Decimal,

    /// Identifiers per catalog lookup
    #[serde(default = "default_product_batch_size")]
    #[validate(range(min = 1, max = 100))]
    pub product_batch_size: usize,

    #[serde(default = "default_max_quantity")]
    #[validate(range(min = 1))]
    pub max_quantity: u32,

    /// Source language of catalog records and fallback canonical language
    #[serde(default = "default_language")]
    #[validate(length(min = 2))]
    pub default_language: String,

    /// Keys tried after the exact and base language when resolving per-language tables
    #[serde(default = "default_fallback_languages")]
    pub fallback_languages: Vec<String>,

    #[serde(default = "default_placeholder_title")]
    #[validate(length(min = 1))]
    pub placeholder_title: String,

    #[serde(default = "default_shipping_line_label")]
    #[validate(length(min = 1))]
    pub shipping_line_label: String,

    #[serde(default = "default_sub_account_prefix")]
    pub sub_account_prefix: String,

    /// Document id of the shared shipping price table and policy
    #[serde(default = "default_document_id")]
    pub default_document_id: String,

    #[serde(default = "default_allowed_origin_patterns")]
    pub allowed_origin_patterns: Vec<String>,

    /// Extra patterns accepted outside production
    #[serde(default = "default_dev_origin_patterns")]
    pub dev_origin_patterns: Vec<String>,

    /// Redirect base used when the caller supplies no usable origin
    #[serde(default)]
    pub public_origin: Option<String>,

    #[serde(default = "default_shipping_countries")]
    pub shipping_countries: Vec<String>,

    #[serde(default = "default_allow_promotion_codes")]
    pub allow_promotion_codes: bool,

    #[serde(default)]
    pub rounding_policy: RoundingPolicy,

    #[serde(default)]
    pub finalization_mode: FinalizationMode,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            settlement_currency: default_settlement_currency(),
            platform_fee_rate: default_platform_fee_rate(),
            destination_fee_rate: default_destination_fee_rate(),
            product_batch_size: default_product_batch_size(),
            max_quantity: default_max_quantity(),
            default_language: default_language(),
            fallback_languages: default_fallback_languages(),
            placeholder_title: default_placeholder_title(),
            shipping_line_label: default_shipping_line_label(),
            sub_account_prefix: default_sub_account_prefix(),
            default_document_id: default_document_id(),
            allowed_origin_patterns: default_allowed_origin_patterns(),
            dev_origin_patterns: default_dev_origin_patterns(),
            public_origin: None,
            shipping_countries: default_shipping_countries(),
            allow_promotion_codes: default_allow_promotion_codes(),
            rounding_policy: RoundingPolicy::default(),
            finalization_mode: FinalizationMode::default(),
        }
    }
}

/// Language tag normalization tables
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LocaleConfig {
    /// Legacy spellings mapped to canonical codes
    #[serde(default = "default_locale_aliases")]
    pub aliases: HashMap<String, String>,

    /// Locales accepted by the hosted checkout page
    #[serde(default = "default_display_locales")]
    #[validate(length(min = 1))]
    pub display_locales: Vec<String>,

    /// Canonical codes shown with a specific display locale
    #[serde(default = "default_display_overrides")]
    pub display_overrides: HashMap<String, String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            aliases: default_locale_aliases(),
            display_locales: default_display_locales(),
            display_overrides: default_display_overrides(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// "database" or "in-memory"
    #[serde(default = "default_storage_backend")]
    #[validate(custom = "validate_storage_backend")]
    pub storage_backend: String,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Outer deadline for every HTTP request (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    #[validate]
    pub gateway: GatewayConfig,

    #[serde(default)]
    #[validate]
    pub checkout: CheckoutConfig,

    #[serde(default)]
    #[validate]
    pub locale: LocaleConfig,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything except the connection basics
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            storage_backend: default_storage_backend(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            gateway: GatewayConfig::default(),
            checkout: CheckoutConfig::default(),
            locale: LocaleConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn uses_in_memory_storage(&self) -> bool {
        self.storage_backend.eq_ignore_ascii_case("in-memory")
    }

    pub fn uses_in_memory_gateway(&self) -> bool {
        self.gateway.provider.eq_ignore_ascii_case("in-memory")
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for pattern in self
            .checkout
            .allowed_origin_patterns
            .iter()
            .chain(self.checkout.dev_origin_patterns.iter())
        {
            if let Err(e) = regex::Regex::new(pattern) {
                let mut err = ValidationError::new("origin_pattern");
                err.message = Some(format!("Invalid origin pattern '{}': {}", pattern, e).into());
                errors.add("allowed_origin_patterns", err);
            }
        }

        if self.checkout.max_quantity > 999 {
            let mut err = ValidationError::new("max_quantity");
            err.message = Some("max_quantity must not exceed 999".into());
            errors.add("max_quantity", err);
        }

        if self.is_production() {
            if self.uses_in_memory_gateway() {
                let mut err = ValidationError::new("gateway_provider_in_memory");
                err.message =
                    Some("The in-memory payment gateway must not be used in production".into());
                errors.add("gateway", err);
            }

            let missing_secret = |value: &Option<String>| {
                value
                    .as_deref()
                    .map(|s| s.trim().is_empty())
                    .unwrap_or(true)
            };
            if missing_secret(&self.gateway.secret_key) {
                let mut err = ValidationError::new("gateway_secret_key_required");
                err.message = Some("Set APP__GATEWAY__SECRET_KEY in production".into());
                errors.add("gateway", err);
            }
            if missing_secret(&self.gateway.webhook_secret) {
                let mut err = ValidationError::new("gateway_webhook_secret_required");
                err.message = Some("Set APP__GATEWAY__WEBHOOK_SECRET in production".into());
                errors.add("gateway", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_storage_backend() -> String {
    DEFAULT_STORAGE_BACKEND.to_string()
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_gateway_provider() -> String {
    DEFAULT_GATEWAY_PROVIDER.to_string()
}

fn default_gateway_api_base() -> String {
    DEFAULT_GATEWAY_API_BASE.to_string()
}

fn default_webhook_tolerance_secs() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

fn default_settlement_currency() -> String {
    "JPY".to_string()
}

fn default_platform_fee_rate() -> Decimal {
    dec!(0.07)
}

fn default_destination_fee_rate() -> Decimal {
    dec!(0.06)
}

fn default_product_batch_size() -> usize {
    10
}

fn default_max_quantity() -> u32 {
    999
}

fn default_language() -> String {
    "ja".to_string()
}

fn default_fallback_languages() -> Vec<String> {
    vec!["en".to_string(), "ja".to_string()]
}

fn default_placeholder_title() -> String {
    "Item".to_string()
}

fn default_shipping_line_label() -> String {
    "Shipping".to_string()
}

fn default_allow_promotion_codes() -> bool {
    true
}

fn default_sub_account_prefix() -> String {
    "acct_".to_string()
}

fn default_document_id() -> String {
    "default".to_string()
}

fn default_allowed_origin_patterns() -> Vec<String> {
    vec![
        r"^https://.+\.pageit\.jp$".to_string(),
        r"^https://.+\.vercel\.app$".to_string(),
    ]
}

fn default_dev_origin_patterns() -> Vec<String> {
    vec![
        r"^http://localhost:\d+$".to_string(),
        r"^http://127\.0\.0\.1:\d+$".to_string(),
    ]
}

fn default_shipping_countries() -> Vec<String> {
    vec!["JP".to_string()]
}

fn default_locale_aliases() -> HashMap<String, String> {
    [
        ("jp", "ja"),
        ("kr", "ko"),
        ("cn", "zh"),
        ("tw", "zh-TW"),
        ("hk", "zh-HK"),
        ("zh-hant", "zh-TW"),
        ("zh-hans", "zh"),
        ("ptbr", "pt-BR"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_display_locales() -> Vec<String> {
    [
        "auto", "bg", "cs", "da", "de", "el", "en", "en-GB", "es", "es-419", "et", "fi", "fil",
        "fr", "fr-CA", "hr", "hu", "id", "it", "ja", "ko", "lt", "lv", "ms", "mt", "nb", "nl",
        "pl", "pt", "pt-BR", "ro", "ru", "sk", "sl", "sv", "th", "tr", "vi", "zh", "zh-HK",
        "zh-TW",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_display_overrides() -> HashMap<String, String> {
    HashMap::from([("en".to_string(), "en-GB".to_string())])
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_storage_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "database" | "in-memory" => Ok(()),
        _ => {
            let mut err = ValidationError::new("storage_backend");
            err.message = Some("Must be one of: database, in-memory".into());
            Err(err)
        }
    }
}

fn validate_gateway_provider(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "stripe" | "in-memory" => Ok(()),
        _ => {
            let mut err = ValidationError::new("gateway_provider");
            err.message = Some("Must be one of: stripe, in-memory".into());
            Err(err)
        }
    }
}

fn validate_settlement_currency(code: &str) -> Result<(), ValidationError> {
    if crate::services::locale::is_zero_decimal(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("settlement_currency");
        err.message = Some(
            format!(
                "settlement_currency must be a zero-decimal currency ({})",
                ZERO_DECIMAL_CURRENCIES.join(", ")
            )
            .into(),
        );
        Err(err)
    }
}

fn validate_fee_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE {
        let mut err = ValidationError::new("fee_rate");
        err.message = Some("fee rates must be between 0 and 1".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("marketplace_checkout={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Loads configuration from an explicit directory and profile
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://marketplace_checkout.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
