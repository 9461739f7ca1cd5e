use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::WaterfallError;
use crate::types::{Money, Rate};
use crate::WaterfallResult;

/// Newton's method stopping tolerance for roots.
const ROOT_TOL: Decimal = dec!(0.0000000000001);

/// Payment (PMT), end-of-period convention.
///
/// Sign follows the spreadsheet convention: a positive present value yields a
/// negative payment.
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> WaterfallResult<Money> {
    if nper == 0 {
        return Err(WaterfallError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let overflow = || {
        WaterfallError::FinancialImpossibility(format!(
            "PMT overflow for rate {rate} over {nper} periods"
        ))
    };

    let one_plus_r = Decimal::ONE + rate;
    let factor = one_plus_r.checked_powu(u64::from(nper)).ok_or_else(overflow)?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    if annuity_factor.is_zero() {
        return Err(WaterfallError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    let future_total = present_value
        .checked_mul(factor)
        .and_then(|v| v.checked_add(future_value))
        .ok_or_else(overflow)?;
    future_total
        .checked_div(annuity_factor)
        .map(|p| -p)
        .ok_or_else(overflow)
}

/// Level monthly payment that fully amortises `balance` over `remaining`
/// months at an annual `rate`. Returned as a positive amount.
pub fn level_payment(balance: Money, annual_rate: Rate, remaining: u32) -> WaterfallResult<Money> {
    let monthly = annual_rate / Decimal::from(12);
    Ok(-pmt(monthly, remaining, balance, Decimal::ZERO)?)
}

/// Compute base^n for a non-negative integer exponent via iterative
/// multiplication. `None` on overflow.
pub(crate) fn iterative_pow(base: Decimal, n: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result.checked_mul(base)?;
    }
    Some(result)
}

/// Compute the nth root of x using Newton's method (40 iterations).
pub(crate) fn nth_root(x: Decimal, n: u32) -> Decimal {
    if x == Decimal::ONE {
        return Decimal::ONE;
    }
    if x == Decimal::ZERO {
        return Decimal::ZERO;
    }
    if n == 0 {
        return Decimal::ONE;
    }
    if n == 1 {
        return x;
    }

    let n_dec = Decimal::from(n);
    let n_minus_1 = n - 1;

    let mut guess = Decimal::ONE;

    for _ in 0..40 {
        let Some(g_n_minus_1) = iterative_pow(guess, n_minus_1) else {
            break;
        };
        if g_n_minus_1.is_zero() {
            break;
        }
        let Some(delta) = g_n_minus_1
            .checked_mul(guess)
            .and_then(|g_n| g_n.checked_sub(x))
            .zip(n_dec.checked_mul(g_n_minus_1))
            .and_then(|(num, den)| num.checked_div(den))
        else {
            break;
        };
        guess -= delta;

        if delta.abs() < ROOT_TOL {
            break;
        }
    }

    guess
}
