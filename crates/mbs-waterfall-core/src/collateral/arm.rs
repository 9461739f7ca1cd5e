use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::WaterfallError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::WaterfallResult;

/// Adjustable-rate coupon reset inputs. Rates may be in any unit (percent or
/// decimal) as long as every field uses the same one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmCouponInput {
    /// Index rate per reset period. The first entry may be absent since the
    /// initial coupon is given.
    pub rate_curve: Vec<Option<Rate>>,
    pub gross_margin: Rate,
    /// Servicing and other fees stripped from the gross coupon.
    pub total_fees: Rate,
    pub initial_coupon: Rate,
    /// Maximum increase of the gross coupon per reset.
    pub periodic_cap: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmCouponRow {
    pub period: u32,
    pub index_rate: Option<Rate>,
    pub gross: Rate,
    pub net: Rate,
}

/// Reset path of an ARM coupon: index plus margin, limited to the prior
/// coupon plus the periodic cap.
pub fn arm_coupons(input: &ArmCouponInput) -> WaterfallResult<ComputationOutput<Vec<ArmCouponRow>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.rate_curve.is_empty() {
        return Err(WaterfallError::InsufficientData(
            "ARM rate curve needs at least one period".into(),
        ));
    }
    if input.periodic_cap < Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: "periodic_cap".into(),
            reason: "Periodic cap cannot be negative".into(),
        });
    }

    let mut rows: Vec<ArmCouponRow> = Vec::with_capacity(input.rate_curve.len());
    let mut gross = input.initial_coupon;
    let mut capped_resets = 0u32;

    for (idx, index_rate) in input.rate_curve.iter().enumerate() {
        if idx > 0 {
            let index = index_rate.ok_or_else(|| WaterfallError::InvalidInput {
                field: "rate_curve".into(),
                reason: format!("missing index rate for period {idx}"),
            })?;
            let uncapped = index + input.gross_margin;
            let ceiling = gross + input.periodic_cap;
            if uncapped <= ceiling {
                gross = uncapped;
            } else {
                gross = ceiling;
                capped_resets += 1;
            }
        }
        rows.push(ArmCouponRow {
            period: idx as u32,
            index_rate: *index_rate,
            gross,
            net: gross - input.total_fees,
        });
    }

    if capped_resets > 0 {
        warnings.push(format!("Periodic cap bound in {capped_resets} reset(s)"));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "ARM coupon resets with periodic cap",
        input,
        warnings,
        elapsed,
        rows,
    ))
}
