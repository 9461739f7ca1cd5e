use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::WaterfallError;
use crate::time_value::iterative_pow;
use crate::types::{Money, Rate};
use crate::WaterfallResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinvestmentOutput {
    /// Growth factor from each period to the horizon.
    pub factors: Vec<Decimal>,
    pub interest_returns: Vec<Money>,
    pub principal_returns: Vec<Money>,
    /// Horizon value of all reinvested interest and principal.
    pub horizon_value: Money,
}

/// Grow each period's interest and principal to the last period of `periods`
/// at a per-period reinvestment rate. Defaults to the full strip.
pub fn reinvestment_returns(
    interest: &[Money],
    principal: &[Money],
    rate: Rate,
    periods: Option<RangeInclusive<usize>>,
) -> WaterfallResult<ReinvestmentOutput> {
    if interest.len() != principal.len() {
        return Err(WaterfallError::DataShape {
            field: "principal".into(),
            expected: interest.len(),
            actual: principal.len(),
        });
    }
    if interest.is_empty() {
        return Err(WaterfallError::InsufficientData(
            "No cash flows to reinvest".into(),
        ));
    }

    let range = periods.unwrap_or(0..=interest.len() - 1);
    let (first, last) = (*range.start(), *range.end());
    if first > last || last >= interest.len() {
        return Err(WaterfallError::InvalidInput {
            field: "periods".into(),
            reason: format!(
                "Period range {first}..={last} outside 0..{}",
                interest.len()
            ),
        });
    }

    let overflow = || {
        WaterfallError::FinancialImpossibility(format!(
            "Reinvestment growth overflow at rate {rate}"
        ))
    };
    let growth = Decimal::ONE + rate;
    let factors: Vec<Decimal> = (first..=last)
        .map(|p| iterative_pow(growth, (last - p) as u32).ok_or_else(overflow))
        .collect::<WaterfallResult<_>>()?;
    let grow = |flows: &[Money]| -> WaterfallResult<Vec<Money>> {
        flows
            .iter()
            .zip(&factors)
            .map(|(cf, f)| cf.checked_mul(*f).ok_or_else(overflow))
            .collect()
    };
    let interest_returns = grow(&interest[first..=last])?;
    let principal_returns = grow(&principal[first..=last])?;
    let horizon_value = interest_returns
        .iter()
        .chain(&principal_returns)
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(overflow)?;

    Ok(ReinvestmentOutput {
        factors,
        interest_returns,
        principal_returns,
        horizon_value,
    })
}
