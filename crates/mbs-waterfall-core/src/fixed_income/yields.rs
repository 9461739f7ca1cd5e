use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::WaterfallError;
use crate::time_value::{iterative_pow, nth_root};
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Years};
use crate::WaterfallResult;

const HUNDRED: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An annual-pay par bond. Yields are quoted in percent (7 = 7%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParYield {
    pub maturity: Years,
    pub yield_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotPoint {
    pub maturity: Years,
    pub par_yield_pct: Decimal,
    /// Annually compounded zero rate in percent.
    pub spot_rate_pct: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Bond-equivalent (semi-annual) yield from a monthly-compounded mortgage
/// yield: `2 * ((1 + mey/12)^6 - 1)`.
pub fn bey_from_mey(mey: Rate) -> WaterfallResult<Rate> {
    let semi = iterative_pow(Decimal::ONE + mey / dec!(12), 6).ok_or_else(|| {
        WaterfallError::FinancialImpossibility(format!("BEY overflow for MEY {mey}"))
    })?;
    (semi - Decimal::ONE)
        .checked_mul(dec!(2))
        .ok_or_else(|| WaterfallError::FinancialImpossibility(format!("BEY overflow for MEY {mey}")))
}

/// Price of a zero-coupon bond: `par / (1 + ytm)^time`.
pub fn zero_coupon_price(par: Money, ytm: Rate, time: Years) -> WaterfallResult<Money> {
    if ytm <= dec!(-1) {
        return Err(WaterfallError::InvalidInput {
            field: "ytm".into(),
            reason: "Yield must be greater than -100%".into(),
        });
    }
    if time < Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: "time".into(),
            reason: "Time to maturity cannot be negative".into(),
        });
    }

    let growth = Decimal::ONE + ytm;
    let factor = if time.fract().is_zero() {
        time.to_u64().and_then(|n| growth.checked_powu(n))
    } else {
        growth.checked_powd(time)
    }
    .ok_or_else(|| WaterfallError::FinancialImpossibility(format!(
        "Discount factor overflow for ytm {ytm} over {time} years"
    )))?;

    if factor.is_zero() {
        return Err(WaterfallError::DivisionByZero {
            context: "zero-coupon discount factor".into(),
        });
    }
    Ok(par / factor)
}

/// Bootstrap annual spot rates from a strip of annual-pay par yields with
/// maturities 1, 2, 3, ... years.
pub fn spot_from_par(par_yields: &[ParYield]) -> WaterfallResult<ComputationOutput<Vec<SpotPoint>>> {
    let start = Instant::now();
    validate_par_strip(par_yields)?;

    let mut spots: Vec<SpotPoint> = Vec::with_capacity(par_yields.len());

    for (i, bond) in par_yields.iter().enumerate() {
        let spot = if i == 0 {
            bond.yield_pct
        } else {
            let pv_coupons: Decimal = spots
                .iter()
                .enumerate()
                .map(|(j, s)| {
                    iterative_pow(Decimal::ONE + s.spot_rate_pct / HUNDRED, j as u32 + 1)
                        .filter(|d| !d.is_zero())
                        .and_then(|d| bond.yield_pct.checked_div(d))
                        .ok_or_else(|| {
                            WaterfallError::FinancialImpossibility(format!(
                                "Discount factor overflow at {} years",
                                s.maturity
                            ))
                        })
                })
                .sum::<WaterfallResult<Decimal>>()?;
            let remaining = HUNDRED - pv_coupons;
            if remaining <= Decimal::ZERO {
                return Err(WaterfallError::FinancialImpossibility(format!(
                    "Coupons at {} years exceed par",
                    bond.maturity
                )));
            }
            let growth = (HUNDRED + bond.yield_pct) / remaining;
            (nth_root(growth, i as u32 + 1) - Decimal::ONE) * HUNDRED
        };

        spots.push(SpotPoint {
            maturity: bond.maturity,
            par_yield_pct: bond.yield_pct,
            spot_rate_pct: spot,
        });
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Spot curve bootstrap from annual par yields",
        &par_yields,
        Vec::new(),
        elapsed,
        spots,
    ))
}

fn validate_par_strip(par_yields: &[ParYield]) -> WaterfallResult<()> {
    if par_yields.is_empty() {
        return Err(WaterfallError::InsufficientData(
            "At least one par yield is required".into(),
        ));
    }
    for (i, bond) in par_yields.iter().enumerate() {
        let expected = Decimal::from(i as u64 + 1);
        if bond.maturity != expected {
            return Err(WaterfallError::InvalidInput {
                field: "maturity".into(),
                reason: format!(
                    "Par strip must run 1, 2, 3, ... years; found {} at position {}",
                    bond.maturity,
                    i + 1
                ),
            });
        }
        if bond.yield_pct <= dec!(-100) {
            return Err(WaterfallError::InvalidInput {
                field: "yield_pct".into(),
                reason: "Yield must be greater than -100%".into(),
            });
        }
    }
    Ok(())
}
