use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::CheckoutConfig;
use crate::errors::ServiceError;
use crate::gateway::SessionSettlement;
use crate::models::{MerchantAccount, SettlementStyle};

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_SUFFIX_LEN: usize = 6;
const KEYED_TOKEN_LEN: usize = 16;

/// Platform cut: `floor(subtotal × rate)`, kept within `[0, subtotal]`.
pub fn platform_fee(subtotal: i64, rate: Decimal) -> i64 {
    if subtotal <= 0 || rate.is_sign_negative() {
        return 0;
    }
    (Decimal::from(subtotal) * rate)
        .floor()
        .to_i64()
        .map(|fee| fee.clamp(0, subtotal))
        .unwrap_or(0)
}

/// Settlement correlation token: `grp_{site}_{unix millis}_{6 base-36 chars}`.
pub fn new_transfer_group(site_key: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TOKEN_SUFFIX_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    format!("grp_{}_{}_{}", site_key, now.timestamp_millis(), suffix)
}

/// Correlation token for a keyed request: `grp_{site}_{first 16 hex of the key hash}`.
///
/// Retries carrying the same idempotency key get the same token, so the gateway sees
/// identical parameters.
pub fn keyed_transfer_group(site_key: &str, key_hash: &str) -> String {
    let digest = key_hash.get(..KEYED_TOKEN_LEN).unwrap_or(key_hash);
    format!("grp_{}_{}", site_key, digest)
}

/// Fee and routing decided for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementPlan {
    pub style: SettlementStyle,
    pub fee_rate: Decimal,
    pub platform_fee: i64,
    pub transfer_group: String,
    pub session: SessionSettlement,
}

/// How a checkout flow settles with the seller. Chosen by entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStrategy {
    SeparateChargesAndTransfers { fee_rate: Decimal },
    Destination { fee_rate: Decimal },
}

impl SettlementStrategy {
    pub fn for_style(style: SettlementStyle, config: &CheckoutConfig) -> Self {
        match style {
            SettlementStyle::SeparateChargesAndTransfers => Self::SeparateChargesAndTransfers {
                fee_rate: config.platform_fee_rate,
            },
            SettlementStyle::Destination => Self::Destination {
                fee_rate: config.destination_fee_rate,
            },
        }
    }

    pub fn style(&self) -> SettlementStyle {
        match self {
            Self::SeparateChargesAndTransfers { .. } => SettlementStyle::SeparateChargesAndTransfers,
            Self::Destination { .. } => SettlementStyle::Destination,
        }
    }

    pub fn fee_rate(&self) -> Decimal {
        match self {
            Self::SeparateChargesAndTransfers { fee_rate } | Self::Destination { fee_rate } => {
                *fee_rate
            }
        }
    }

    /// Destination charges need a sub-account that can collect charges itself.
    pub fn ensure_capable(&self, merchant: &MerchantAccount) -> Result<(), ServiceError> {
        match self {
            Self::Destination { .. } if !merchant.onboarding_completed => {
                Err(ServiceError::SubAccountMissing(format!(
                    "onboarding is not complete for site {}",
                    merchant.site_key
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn plan(&self, sub_account_id: &str, subtotal: i64, transfer_group: String) -> SettlementPlan {
        let fee_rate = self.fee_rate();
        let platform_fee = platform_fee(subtotal, fee_rate);
        let session = match self {
            Self::SeparateChargesAndTransfers { .. } => SessionSettlement::TransferGroup {
                transfer_group: transfer_group.clone(),
            },
            Self::Destination { .. } => SessionSettlement::Destination {
                destination: sub_account_id.to_string(),
                application_fee_amount: platform_fee,
            },
        };

        SettlementPlan {
            style: self.style(),
            fee_rate,
            platform_fee,
            transfer_group,
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fee_is_floored_fraction_of_subtotal() {
        assert_eq!(platform_fee(1000, dec!(0.07)), 70);
        assert_eq!(platform_fee(999, dec!(0.07)), 69);
        assert_eq!(platform_fee(1, dec!(0.07)), 0);
        assert_eq!(platform_fee(0, dec!(0.07)), 0);
        assert_eq!(platform_fee(-5, dec!(0.07)), 0);
        assert_eq!(platform_fee(1234, dec!(1)), 1234);
        assert_eq!(platform_fee(i64::MAX, dec!(0.06)), 553_402_322_211_286_548);
    }

    #[test]
    fn transfer_group_shape() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let token = new_transfer_group("shop-1", now);
        let prefix = format!("grp_shop-1_{}_", now.timestamp_millis());
        assert!(token.starts_with(&prefix));
        let suffix = &token[prefix.len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(token, new_transfer_group("shop-1", now));
    }

    #[test]
    fn keyed_transfer_group_is_stable() {
        let hash = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
        let token = keyed_transfer_group("shop-1", hash);
        assert_eq!(token, "grp_shop-1_9f86d081884c7d65");
        assert_eq!(token, keyed_transfer_group("shop-1", hash));
        assert_ne!(token, keyed_transfer_group("shop-2", hash));
    }

    #[test]
    fn separate_charges_attach_transfer_group_only() {
        let strategy = SettlementStrategy::SeparateChargesAndTransfers {
            fee_rate: dec!(0.07),
        };
        let plan = strategy.plan("acct_1", 1000, "grp_x".into());
        assert_eq!(plan.platform_fee, 70);
        assert_eq!(
            plan.session,
            SessionSettlement::TransferGroup {
                transfer_group: "grp_x".into()
            }
        );
    }

    #[test]
    fn destination_routes_funds_with_inline_fee() {
        let strategy = SettlementStrategy::Destination {
            fee_rate: dec!(0.06),
        };
        let plan = strategy.plan("acct_1", 1050, "grp_x".into());
        assert_eq!(plan.platform_fee, 63);
        assert_eq!(
            plan.session,
            SessionSettlement::Destination {
                destination: "acct_1".into(),
                application_fee_amount: 63
            }
        );
        assert_eq!(plan.transfer_group, "grp_x");
    }

    #[test]
    fn destination_requires_completed_onboarding() {
        let strategy = SettlementStrategy::Destination {
            fee_rate: dec!(0.06),
        };
        let mut merchant = MerchantAccount {
            site_key: "shop".into(),
            sub_account_id: Some("acct_1".into()),
            onboarding_completed: false,
            sales_suspended: false,
        };
        assert!(strategy.ensure_capable(&merchant).is_err());
        merchant.onboarding_completed = true;
        assert!(strategy.ensure_capable(&merchant).is_ok());

        let separate = SettlementStrategy::SeparateChargesAndTransfers {
            fee_rate: dec!(0.07),
        };
        merchant.onboarding_completed = false;
        assert!(separate.ensure_capable(&merchant).is_ok());
    }
}
