use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::rates::smm_to_cpr;
use crate::error::WaterfallError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::WaterfallResult;

/// Default seasoning ramp length in months.
pub const DEFAULT_SEASONING_MONTHS: u32 = 30;

/// Default burnout sensitivity.
pub const DEFAULT_BURNOUT_SENSITIVITY: Decimal = dec!(0.7);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A pool made of fast (active) and slow (passive) prepayers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCompositionInput {
    /// Monthly SMM of the fast group.
    pub fast_smm: Rate,
    /// Starting share of the pool held by fast prepayers.
    pub fast_amount: Decimal,
    /// Monthly SMM of the slow group.
    pub slow_smm: Rate,
    /// Starting share of the pool held by slow prepayers.
    pub slow_amount: Decimal,
    /// Number of months to project.
    pub periods: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCompositionRow {
    pub period: u32,
    pub fast_amount: Decimal,
    pub fast_smm: Rate,
    pub slow_amount: Decimal,
    pub slow_smm: Rate,
    pub pool_smm: Rate,
    pub pool_cpr: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCompositionOutput {
    pub rows: Vec<PoolCompositionRow>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project pool prepayment speed as fast prepayers leave the pool.
///
/// Each group's share shrinks by its own SMM relative to the pool SMM of the
/// prior month, so the pool drifts towards the slow group's speed (burnout).
pub fn pool_prepayment_from_composition(
    input: &PoolCompositionInput,
) -> WaterfallResult<ComputationOutput<PoolCompositionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate(input)?;

    let total = input.fast_amount + input.slow_amount;
    if (total - Decimal::ONE).abs() > dec!(0.0001) {
        warnings.push(format!(
            "Fast and slow shares sum to {total}, not 1; pool SMM is scaled accordingly"
        ));
    }

    let mut rows: Vec<PoolCompositionRow> = Vec::with_capacity(input.periods as usize);
    let mut fast = input.fast_amount;
    let mut slow = input.slow_amount;

    for period in 1..=input.periods {
        if let Some(prev) = rows.last() {
            let survival = Decimal::ONE - prev.pool_smm;
            if survival.is_zero() {
                return Err(WaterfallError::DivisionByZero {
                    context: format!("pool survival in period {}", period - 1),
                });
            }
            fast = prev.fast_amount * (Decimal::ONE - input.fast_smm) / survival;
            slow = prev.slow_amount * (Decimal::ONE - input.slow_smm) / survival;
        }

        let pool_smm = fast * input.fast_smm + slow * input.slow_smm;
        rows.push(PoolCompositionRow {
            period,
            fast_amount: fast,
            fast_smm: input.fast_smm,
            slow_amount: slow,
            slow_smm: input.slow_smm,
            pool_smm,
            pool_cpr: smm_to_cpr(pool_smm),
        });
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pool prepayment from fast/slow prepayer composition",
        input,
        warnings,
        elapsed,
        PoolCompositionOutput { rows },
    ))
}

/// Seasoning multiplier: `min(age / ramp, 1)`.
pub fn seasoning_factor(age: u32, ramp_months: u32) -> Decimal {
    if ramp_months == 0 || age >= ramp_months {
        return Decimal::ONE;
    }
    Decimal::from(age) / Decimal::from(ramp_months)
}

/// Burnout multiplier: `1 - sensitivity * (1 - pool_factor)`.
pub fn burnout_factor(pool_factor: Decimal, sensitivity: Decimal) -> Decimal {
    Decimal::ONE - sensitivity * (Decimal::ONE - pool_factor)
}

fn validate(input: &PoolCompositionInput) -> WaterfallResult<()> {
    for (field, smm) in [("fast_smm", input.fast_smm), ("slow_smm", input.slow_smm)] {
        if smm < Decimal::ZERO || smm > Decimal::ONE {
            return Err(WaterfallError::InvalidInput {
                field: field.into(),
                reason: "SMM must be between 0 and 1".into(),
            });
        }
    }
    for (field, amount) in [
        ("fast_amount", input.fast_amount),
        ("slow_amount", input.slow_amount),
    ] {
        if amount < Decimal::ZERO {
            return Err(WaterfallError::InvalidInput {
                field: field.into(),
                reason: "Share must be non-negative".into(),
            });
        }
    }
    if input.periods == 0 {
        return Err(WaterfallError::InvalidInput {
            field: "periods".into(),
            reason: "Periods must be greater than zero".into(),
        });
    }
    Ok(())
}
