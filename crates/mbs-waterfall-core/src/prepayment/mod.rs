//! Prepayment rate conventions (CPR, SMM, PSA), CPR curve construction from
//! text descriptions, and pool speed evolution for mixed prepayer populations.

pub mod composition;
pub mod curve;
pub mod rates;

pub use composition::{
    burnout_factor, pool_prepayment_from_composition, seasoning_factor, PoolCompositionInput,
    PoolCompositionOutput, PoolCompositionRow,
};
pub use curve::{
    build_cpr_curve, cpr_curve_from_description, CprCurveInput, CprCurveOutput, MAX_CURVE_MONTHS,
    PSA_DESCRIPTION,
};
pub use rates::{cpr_to_smm, psa_cpr, smm_to_cpr};
