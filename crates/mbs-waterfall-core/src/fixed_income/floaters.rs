use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::WaterfallError;
use crate::types::Rate;
use crate::WaterfallResult;

/// A floater / inverse floater pair carved from a fixed-rate class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloaterInput {
    /// Share of the parent class principal in the floater.
    pub floater_size: Decimal,
    /// Share of the parent class principal in the inverse floater.
    pub inverse_size: Decimal,
    /// Fixed coupon paid by the parent class.
    pub available_coupon: Rate,
    /// Floater margin over the index.
    pub margin: Rate,
    /// Index level (LIBOR, CMT, ...).
    pub index_rate: Rate,
}

impl Default for FloaterInput {
    fn default() -> Self {
        Self {
            floater_size: dec!(0.75),
            inverse_size: dec!(0.25),
            available_coupon: dec!(0.09),
            margin: dec!(0.01),
            index_rate: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloaterRates {
    pub leverage: Decimal,
    /// Floater coupon at which the inverse floater pays zero.
    pub floater_cap: Rate,
    pub floater_rate: Rate,
    pub inverse_rate: Rate,
}

/// Coupons on a floater / inverse floater pair for a given index level.
///
/// The floater pays index + margin up to the cap; the inverse absorbs the
/// rest of the available coupon, levered by floater_size / inverse_size and
/// floored at zero.
pub fn floater_rates(input: &FloaterInput) -> WaterfallResult<FloaterRates> {
    if input.inverse_size <= Decimal::ZERO || input.floater_size <= Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: "inverse_size".into(),
            reason: "Floater and inverse sizes must be positive".into(),
        });
    }

    let leverage = input.floater_size / input.inverse_size;
    let floater_cap = input.available_coupon + input.available_coupon / leverage;
    let floater_rate = (input.index_rate + input.margin).min(floater_cap);
    let inverse_rate = (input.available_coupon
        + leverage * (input.available_coupon - floater_rate))
        .max(Decimal::ZERO);

    Ok(FloaterRates {
        leverage,
        floater_cap,
        floater_rate,
        inverse_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_index(index_rate: Rate) -> FloaterRates {
        floater_rates(&FloaterInput {
            index_rate,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_zero_index() {
        let r = at_index(Decimal::ZERO);
        assert_eq!(r.leverage, dec!(3));
        assert_eq!(r.floater_rate, dec!(0.01));
        assert_eq!(r.inverse_rate, dec!(0.33));
    }

    #[test]
    fn test_coupon_is_conserved() {
        let r = at_index(dec!(0.05));
        assert_eq!(r.floater_rate, dec!(0.06));
        assert_eq!(r.inverse_rate, dec!(0.18));
        assert_eq!(
            dec!(0.75) * r.floater_rate + dec!(0.25) * r.inverse_rate,
            dec!(0.09)
        );
    }

    #[test]
    fn test_floater_capped_and_inverse_floored() {
        let r = at_index(dec!(0.20));
        assert_eq!(r.floater_rate, dec!(0.12));
        assert_eq!(r.floater_cap, dec!(0.12));
        assert_eq!(r.inverse_rate, Decimal::ZERO);
    }

    #[test]
    fn test_zero_inverse_rejected() {
        let input = FloaterInput {
            inverse_size: Decimal::ZERO,
            ..Default::default()
        };
        assert!(floater_rates(&input).is_err());
    }
}
