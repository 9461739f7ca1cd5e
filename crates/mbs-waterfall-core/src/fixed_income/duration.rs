use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::WaterfallError;
use crate::types::{Money, Rate, Years};
use crate::WaterfallResult;

/// Macaulay duration in years of a cash-flow strip discounted at a
/// semi-annually compounded yield.
///
/// `times` are in years and may fall between coupon dates (e.g. monthly
/// mortgage flows at k/12).
pub fn macaulay_duration(
    price: Money,
    times: &[Years],
    cash_flows: &[Money],
    yld: Rate,
) -> WaterfallResult<Decimal> {
    if times.len() != cash_flows.len() {
        return Err(WaterfallError::DataShape {
            field: "cash_flows".into(),
            expected: times.len(),
            actual: cash_flows.len(),
        });
    }
    if price.is_zero() {
        return Err(WaterfallError::DivisionByZero {
            context: "Macaulay duration: price is zero".into(),
        });
    }
    let half_yield = Decimal::ONE + yld / dec!(2);
    if half_yield <= Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: "yld".into(),
            reason: "Yield must be greater than -200%".into(),
        });
    }

    let mut weighted = Decimal::ZERO;
    for (t, cf) in times.iter().zip(cash_flows) {
        let df = half_yield.checked_powd(dec!(2) * t).ok_or_else(|| {
            WaterfallError::FinancialImpossibility(format!("Discount factor overflow at t = {t}"))
        })?;
        weighted += t * cf / df;
    }
    Ok(weighted / price)
}

/// Modified duration from Macaulay duration under semi-annual compounding.
pub fn modified_duration(duration: Decimal, yld: Rate) -> WaterfallResult<Decimal> {
    let denom = Decimal::ONE + yld / dec!(2);
    if denom.is_zero() {
        return Err(WaterfallError::DivisionByZero {
            context: "modified duration".into(),
        });
    }
    Ok(duration / denom)
}

/// Effective duration from prices after parallel yield shifts of
/// `-yld_delta` (`price_down`) and `+yld_delta` (`price_up`):
/// `(P_down - P_up) / (2 * P * dy)`.
pub fn effective_duration(
    price: Money,
    price_down: Money,
    price_up: Money,
    yld_delta: Rate,
) -> WaterfallResult<Decimal> {
    if price.is_zero() || yld_delta.is_zero() {
        return Err(WaterfallError::DivisionByZero {
            context: "effective duration".into(),
        });
    }
    Ok((price_down - price_up) / (dec!(2) * price * yld_delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    #[test]
    fn test_macaulay_two_year_par_bond() {
        let times = [dec!(0.5), dec!(1), dec!(1.5), dec!(2)];
        let flows = [dec!(2.5), dec!(2.5), dec!(2.5), dec!(102.5)];
        let d = macaulay_duration(dec!(100), &times, &flows, dec!(0.05)).unwrap();
        assert_close(d, dec!(1.928012), dec!(0.00001), "Macaulay");
    }

    #[test]
    fn test_zero_coupon_duration_is_maturity() {
        let price = dec!(100) / dec!(1.05).powu(6);
        let d = macaulay_duration(price, &[dec!(3)], &[dec!(100)], dec!(0.10)).unwrap();
        assert_close(d, dec!(3), dec!(0.000001), "zero duration");
    }

    #[test]
    fn test_macaulay_shape_mismatch() {
        let result = macaulay_duration(dec!(100), &[dec!(1)], &[], dec!(0.05));
        assert!(matches!(result, Err(WaterfallError::DataShape { .. })));
    }

    #[test]
    fn test_modified_duration() {
        let m = modified_duration(dec!(1.928012), dec!(0.05)).unwrap();
        assert_close(m, dec!(1.881), dec!(0.001), "modified");
    }

    #[test]
    fn test_effective_duration() {
        // 101 / 99 around 100 for a 50 bp shift -> 2.0
        let d = effective_duration(dec!(100), dec!(101), dec!(99), dec!(0.005)).unwrap();
        assert_eq!(d, dec!(2));
        assert!(effective_duration(dec!(100), dec!(101), dec!(99), dec!(0)).is_err());
    }
}
