use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::time_value::{iterative_pow, nth_root};
use crate::types::Rate;

/// PSA base CPR at month 30 (6% annual).
const PSA_BASE_CPR_30: Decimal = dec!(0.06);

/// Month at which the PSA ramp levels off.
const PSA_RAMP_MONTHS: u32 = 30;

/// 100% PSA benchmark CPR for a loan of the given age in months:
/// 0.2% per month up to month 30, 6% thereafter.
pub fn psa_cpr(month: u32) -> Rate {
    if month <= PSA_RAMP_MONTHS {
        PSA_BASE_CPR_30 * Decimal::from(month) / Decimal::from(PSA_RAMP_MONTHS)
    } else {
        PSA_BASE_CPR_30
    }
}

/// Convert annual CPR to single monthly mortality (SMM).
/// SMM = 1 - (1 - CPR)^(1/12)
pub fn cpr_to_smm(cpr: Rate) -> Rate {
    if cpr <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if cpr >= Decimal::ONE {
        return Decimal::ONE;
    }
    let base = Decimal::ONE - cpr;
    Decimal::ONE - nth_root(base, 12)
}

/// Convert SMM back to annualised CPR.
/// CPR = 1 - (1 - SMM)^12
pub fn smm_to_cpr(smm: Rate) -> Rate {
    if smm <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if smm >= Decimal::ONE {
        return Decimal::ONE;
    }
    // powers of a base in (0, 1) stay in (0, 1)
    iterative_pow(Decimal::ONE - smm, 12).map_or(Decimal::ONE, |p| Decimal::ONE - p)
}
