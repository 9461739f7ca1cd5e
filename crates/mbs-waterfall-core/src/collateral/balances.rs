use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WaterfallError;
use crate::time_value::iterative_pow;
use crate::types::{Money, Rate};
use crate::WaterfallResult;

/// Scheduled (no-prepayment) balance after `period` payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBalance {
    pub period: u32,
    pub scheduled_balance: Money,
    /// Scheduled balance as a fraction of the original balance.
    pub bal_percent: Rate,
}

/// Scheduled balances for a level-pay loan, periods `0..=nper`.
pub fn schedule_of_ending_balances(
    annual_rate: Rate,
    nper: u32,
    present_value: Money,
) -> WaterfallResult<Vec<ScheduledBalance>> {
    let periodic = annual_rate / Decimal::from(12);
    (0..=nper)
        .map(|period| {
            let bal_percent = balance_percent_for_period(periodic, nper, period)?;
            Ok(ScheduledBalance {
                period,
                scheduled_balance: bal_percent * present_value,
                bal_percent,
            })
        })
        .collect()
}

/// Fraction of original balance outstanding after `age` of `nper` payments:
/// `1 - ((1+r)^age - 1) / ((1+r)^nper - 1)` for a periodic rate `r`.
pub fn balance_percent_for_period(periodic_rate: Rate, nper: u32, age: u32) -> WaterfallResult<Rate> {
    if nper == 0 {
        return Err(WaterfallError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }
    if age > nper {
        return Err(WaterfallError::InvalidInput {
            field: "age".into(),
            reason: format!("Age {age} exceeds term of {nper} periods"),
        });
    }
    if periodic_rate.is_zero() {
        return Ok(Decimal::ONE - Decimal::from(age) / Decimal::from(nper));
    }

    let growth = Decimal::ONE + periodic_rate;
    let overflow = || {
        WaterfallError::FinancialImpossibility(format!(
            "Balance factor overflow for periodic rate {periodic_rate} over {nper} periods"
        ))
    };
    let denom = iterative_pow(growth, nper).ok_or_else(overflow)? - Decimal::ONE;
    if denom.is_zero() {
        return Err(WaterfallError::DivisionByZero {
            context: "scheduled balance factor".into(),
        });
    }
    let grown = iterative_pow(growth, age).ok_or_else(overflow)?;
    Ok(Decimal::ONE - (grown - Decimal::ONE) / denom)
}

/// Balances after prepayments: each scheduled ending balance (except the
/// last) reduced by the month's SMM.
pub fn actual_balances(ending_balances: &[Money], smm: &[Rate]) -> WaterfallResult<Vec<Money>> {
    let n = ending_balances.len().saturating_sub(1);
    if smm.len() != n {
        return Err(WaterfallError::DataShape {
            field: "smm".into(),
            expected: n,
            actual: smm.len(),
        });
    }
    Ok(ending_balances[..n]
        .iter()
        .zip(smm)
        .map(|(bal, s)| bal * (Decimal::ONE - s))
        .collect())
}
