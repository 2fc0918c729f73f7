use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::config::RoundingPolicy;
use crate::errors::ServiceError;
use crate::models::CheckoutLine;

pub const MIN_QUANTITY: u32 = 1;

/// Line and order arithmetic over tax-inclusive integer prices.
#[derive(Debug, Clone, Copy)]
pub struct PricingEngine {
    max_quantity: u32,
    rounding: RoundingPolicy,
}

impl PricingEngine {
    pub fn new(max_quantity: u32, rounding: RoundingPolicy) -> Self {
        Self {
            max_quantity: max_quantity.max(MIN_QUANTITY),
            rounding,
        }
    }

    pub fn rounding(&self) -> RoundingPolicy {
        self.rounding
    }

    /// Clamps a requested quantity into `[1, max_quantity]`.
    ///
    /// Numbers and numeric strings are floored; anything else, including non-finite values,
    /// counts as 1. Nothing is rejected.
    pub fn clamp_quantity(&self, raw: Option<&Value>) -> u32 {
        let requested = match raw {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match requested {
            Some(value) if value.is_finite() => {
                let floored = value.floor();
                if floored < f64::from(MIN_QUANTITY) {
                    MIN_QUANTITY
                } else if floored > f64::from(self.max_quantity) {
                    self.max_quantity
                } else {
                    floored as u32
                }
            }
            _ => MIN_QUANTITY,
        }
    }

    /// Prices one line; `None` when the stored price makes the item not purchasable.
    pub fn price_line(
        &self,
        product_id: &str,
        name: String,
        unit_amount: Option<i64>,
        quantity: u32,
    ) -> Result<Option<CheckoutLine>, ServiceError> {
        let unit_amount = match unit_amount {
            Some(amount) if amount > 0 => amount,
            _ => return Ok(None),
        };
        let line_total = unit_amount
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| amount_overflow(product_id))?;

        Ok(Some(CheckoutLine {
            product_id: product_id.to_string(),
            name,
            quantity,
            unit_amount,
            line_total,
        }))
    }

    /// Sum of line totals.
    pub fn subtotal(&self, lines: &[CheckoutLine]) -> Result<i64, ServiceError> {
        lines.iter().try_fold(0_i64, |acc, line| {
            acc.checked_add(line.line_total)
                .ok_or_else(|| amount_overflow("subtotal"))
        })
    }

    /// Tax-inclusive amount for a tax-exclusive one at `rate` (0.10 for 10%).
    pub fn tax_inclusive_from_exclusive(
        &self,
        amount: i64,
        rate: Decimal,
    ) -> Result<i64, ServiceError> {
        let (amount, factor) = conversion_inputs(amount, rate)?;
        self.round_to_unit(amount * factor)
    }

    /// Tax-exclusive amount contained in a tax-inclusive one at `rate`.
    pub fn tax_exclusive_from_inclusive(
        &self,
        amount: i64,
        rate: Decimal,
    ) -> Result<i64, ServiceError> {
        let (amount, factor) = conversion_inputs(amount, rate)?;
        self.round_to_unit(amount / factor)
    }

    fn round_to_unit(&self, value: Decimal) -> Result<i64, ServiceError> {
        let rounded = match self.rounding {
            RoundingPolicy::HalfUp => {
                value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
            RoundingPolicy::Floor => value.floor(),
            RoundingPolicy::Ceil => value.ceil(),
        };
        rounded
            .to_i64()
            .ok_or_else(|| amount_overflow("tax conversion"))
    }
}

fn conversion_inputs(amount: i64, rate: Decimal) -> Result<(Decimal, Decimal), ServiceError> {
    if amount < 0 {
        return Err(ServiceError::ValidationError(
            "amounts must not be negative".to_string(),
        ));
    }
    if rate.is_sign_negative() {
        return Err(ServiceError::ValidationError(
            "tax rate must not be negative".to_string(),
        ));
    }
    Ok((Decimal::from(amount), Decimal::ONE + rate))
}

fn amount_overflow(context: &str) -> ServiceError {
    ServiceError::ValidationError(format!("amount out of range: {}", context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn engine(policy: RoundingPolicy) -> PricingEngine {
        PricingEngine::new(999, policy)
    }

    #[rstest]
    #[case(None, 1)]
    #[case(Some(json!(2)), 2)]
    #[case(Some(json!(2.9)), 2)]
    #[case(Some(json!(0)), 1)]
    #[case(Some(json!(-5)), 1)]
    #[case(Some(json!(1000)), 999)]
    #[case(Some(json!(1e300)), 999)]
    #[case(Some(json!("3")), 3)]
    #[case(Some(json!("abc")), 1)]
    #[case(Some(json!("inf")), 1)]
    #[case(Some(json!(null)), 1)]
    #[case(Some(json!([4])), 1)]
    fn clamps_quantities(#[case] raw: Option<Value>, #[case] expected: u32) {
        assert_eq!(
            engine(RoundingPolicy::HalfUp).clamp_quantity(raw.as_ref()),
            expected
        );
    }

    #[test]
    fn non_positive_prices_are_dropped() {
        let e = engine(RoundingPolicy::HalfUp);
        assert!(e.price_line("p", "n".into(), Some(0), 1).unwrap().is_none());
        assert!(e.price_line("p", "n".into(), Some(-10), 1).unwrap().is_none());
        assert!(e.price_line("p", "n".into(), None, 1).unwrap().is_none());

        let line = e.price_line("p", "n".into(), Some(500), 2).unwrap().unwrap();
        assert_eq!(line.line_total, 1000);
    }

    #[test]
    fn subtotal_sums_lines_and_detects_overflow() {
        let e = engine(RoundingPolicy::HalfUp);
        let a = e.price_line("a", "A".into(), Some(500), 2).unwrap().unwrap();
        let b = e.price_line("b", "B".into(), Some(120), 3).unwrap().unwrap();
        assert_eq!(e.subtotal(&[a, b]).unwrap(), 1360);

        let huge = e
            .price_line("h", "H".into(), Some(i64::MAX / 2), 1)
            .unwrap()
            .unwrap();
        assert!(e.subtotal(&[huge.clone(), huge.clone(), huge]).is_err());
        assert!(e.price_line("h", "H".into(), Some(i64::MAX), 2).is_err());
    }

    #[rstest]
    #[case(RoundingPolicy::HalfUp, 1155)]
    #[case(RoundingPolicy::Floor, 1154)]
    #[case(RoundingPolicy::Ceil, 1155)]
    fn exclusive_to_inclusive_rounding(#[case] policy: RoundingPolicy, #[case] expected: i64) {
        // 1069 * 1.08 = 1154.52
        assert_eq!(
            engine(policy)
                .tax_inclusive_from_exclusive(1069, dec!(0.08))
                .unwrap(),
            expected
        );
    }

    #[test]
    fn half_up_rounds_midpoints_away_from_zero() {
        // 25 * 1.10 = 27.5
        assert_eq!(
            engine(RoundingPolicy::HalfUp)
                .tax_inclusive_from_exclusive(25, dec!(0.10))
                .unwrap(),
            28
        );
        assert_eq!(
            engine(RoundingPolicy::Floor)
                .tax_inclusive_from_exclusive(25, dec!(0.10))
                .unwrap(),
            27
        );
    }

    #[test]
    fn inclusive_to_exclusive() {
        let e = engine(RoundingPolicy::HalfUp);
        assert_eq!(e.tax_exclusive_from_inclusive(1100, dec!(0.10)).unwrap(), 1000);
        // 1000 / 1.08 = 925.92...
        assert_eq!(e.tax_exclusive_from_inclusive(1000, dec!(0.08)).unwrap(), 926);
        assert_eq!(
            engine(RoundingPolicy::Floor)
                .tax_exclusive_from_inclusive(1000, dec!(0.08))
                .unwrap(),
            925
        );
        assert!(e.tax_exclusive_from_inclusive(-1, dec!(0.08)).is_err());
        assert!(e.tax_exclusive_from_inclusive(1, dec!(-0.08)).is_err());
    }
}
