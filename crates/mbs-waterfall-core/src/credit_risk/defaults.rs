//! Pool default measures and the one-factor Gaussian (Vasicek) default-rate
//! model.

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::WaterfallError;
use crate::types::{Money, Rate};
use crate::WaterfallResult;

/// Share of a period's beginning balance that defaulted in the period.
pub fn hazard(beginning_balance: Money, period_defaults: Money) -> WaterfallResult<Rate> {
    if beginning_balance.is_zero() {
        return Err(WaterfallError::DivisionByZero {
            context: "hazard: beginning balance is zero".into(),
        });
    }
    Ok(period_defaults / beginning_balance)
}

/// Period-by-period hazard rates for a balance and default history.
pub fn hazard_rates(
    beginning_balances: &[Money],
    period_defaults: &[Money],
) -> WaterfallResult<Vec<Rate>> {
    if beginning_balances.len() != period_defaults.len() {
        return Err(WaterfallError::DataShape {
            field: "period_defaults".into(),
            expected: beginning_balances.len(),
            actual: period_defaults.len(),
        });
    }
    beginning_balances
        .iter()
        .zip(period_defaults)
        .map(|(b, d)| hazard(*b, *d))
        .collect()
}

/// Conditional default rate given the common factor `x`:
/// `N((N^-1(pd) - x * sqrt(rho)) / sqrt(1 - rho))`.
pub fn vasicek_default_rate(x: f64, rho: f64, pd: f64) -> WaterfallResult<f64> {
    validate_pd(pd)?;
    if !(0.0..1.0).contains(&rho) {
        return Err(WaterfallError::InvalidInput {
            field: "rho".into(),
            reason: "Asset correlation must be in [0, 1)".into(),
        });
    }
    let n = standard_normal()?;
    Ok(n.cdf((n.inverse_cdf(pd) - x * rho.sqrt()) / (1.0 - rho).sqrt()))
}

/// Probability that the common factor falls below the level that produces
/// each observed default rate:
/// `N((N^-1(pd) - sqrt(1 - rho) * N^-1(d)) / sqrt(rho))`.
pub fn inverse_vasicek(pd: f64, rho: f64, default_rates: &[f64]) -> WaterfallResult<Vec<f64>> {
    validate_pd(pd)?;
    if !(rho > 0.0 && rho < 1.0) {
        return Err(WaterfallError::InvalidInput {
            field: "rho".into(),
            reason: "Asset correlation must be in (0, 1)".into(),
        });
    }
    let n = standard_normal()?;
    let threshold = n.inverse_cdf(pd);
    default_rates
        .iter()
        .map(|d| {
            if !(*d > 0.0 && *d < 1.0) {
                return Err(WaterfallError::InvalidInput {
                    field: "default_rates".into(),
                    reason: format!("Default rate {d} must be in (0, 1)"),
                });
            }
            Ok(n.cdf((threshold - (1.0 - rho).sqrt() * n.inverse_cdf(*d)) / rho.sqrt()))
        })
        .collect()
}

/// Density of the conditional default rate at `d`, used for loss
/// distribution plots and sanity checks.
pub fn vasicek_density(d: f64, rho: f64, pd: f64) -> WaterfallResult<f64> {
    validate_pd(pd)?;
    if !(rho > 0.0 && rho < 1.0) || !(d > 0.0 && d < 1.0) {
        return Err(WaterfallError::InvalidInput {
            field: "d".into(),
            reason: "Default rate and correlation must be in (0, 1)".into(),
        });
    }
    let n = standard_normal()?;
    let inv_d = n.inverse_cdf(d);
    let z = ((1.0 - rho).sqrt() * inv_d - n.inverse_cdf(pd)) / rho.sqrt();
    Ok(((1.0 - rho) / rho).sqrt() * n.pdf(z) / n.pdf(inv_d))
}

fn standard_normal() -> WaterfallResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| WaterfallError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })
}

fn validate_pd(pd: f64) -> WaterfallResult<()> {
    if !(pd > 0.0 && pd < 1.0) {
        return Err(WaterfallError::InvalidInput {
            field: "pd".into(),
            reason: "Probability of default must be in (0, 1)".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const TOL: f64 = 1e-6;

    #[test]
    fn test_hazard() {
        assert_eq!(hazard(dec!(1_000_000), dec!(2_500)).unwrap(), dec!(0.0025));
        assert!(matches!(
            hazard(Decimal::ZERO, dec!(1)),
            Err(WaterfallError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_hazard_rates_shape() {
        let rates = hazard_rates(&[dec!(100), dec!(80)], &[dec!(1), dec!(2)]).unwrap();
        assert_eq!(rates, vec![dec!(0.01), dec!(0.025)]);
        assert!(hazard_rates(&[dec!(100)], &[]).is_err());
    }

    #[test]
    fn test_zero_correlation_returns_pd() {
        let d = vasicek_default_rate(1.5, 0.0, 0.02).unwrap();
        assert!((d - 0.02).abs() < TOL);
    }

    #[test]
    fn test_vasicek_known_values() {
        let neutral = vasicek_default_rate(0.0, 0.2, 0.02).unwrap();
        assert!((neutral - 0.010833).abs() < TOL);
        let stressed = vasicek_default_rate(-2.0, 0.2, 0.02).unwrap();
        assert!((stressed - 0.097460).abs() < TOL);
    }

    #[test]
    fn test_inverse_recovers_factor_probability() {
        let d = vasicek_default_rate(1.0, 0.2, 0.02).unwrap();
        let w = inverse_vasicek(0.02, 0.2, &[d]).unwrap();
        assert!((w[0] - 0.841345).abs() < TOL);
    }

    #[test]
    fn test_density_is_positive() {
        let f = vasicek_density(0.02, 0.2, 0.02).unwrap();
        assert!(f > 0.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(vasicek_default_rate(0.0, 0.2, 0.0).is_err());
        assert!(vasicek_default_rate(0.0, 1.0, 0.02).is_err());
        assert!(inverse_vasicek(0.02, 0.0, &[0.01]).is_err());
        assert!(inverse_vasicek(0.02, 0.2, &[1.0]).is_err());
    }
}
