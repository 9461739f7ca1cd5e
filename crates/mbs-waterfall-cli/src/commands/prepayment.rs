use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mbs_waterfall_core::prepayment::{
    build_cpr_curve, pool_prepayment_from_composition, CprCurveInput, PoolCompositionInput,
    PSA_DESCRIPTION,
};

use crate::input;

#[derive(Args)]
pub struct CprCurveArgs {
    /// Curve description, e.g. ".2 ramp 6 for 30, 6"
    #[arg(long, default_value = PSA_DESCRIPTION)]
    pub description: String,
    /// Speed multiplier applied to every point
    #[arg(long, default_value = "1")]
    pub speed: Decimal,
}

#[derive(Args)]
pub struct CompositionArgs {
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_cpr_curve(args: CprCurveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let result = build_cpr_curve(&CprCurveInput {
        description: args.description,
        speed_multiplier: args.speed,
    })?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_composition(args: CompositionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let comp_input: PoolCompositionInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for pool composition")?;
    let result = pool_prepayment_from_composition(&comp_input)?;
    Ok(serde_json::to_value(result)?)
}
