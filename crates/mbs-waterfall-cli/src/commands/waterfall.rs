use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mbs_waterfall_core::collateral::{create_waterfall, PsaSpeed, WaterfallInput};

use crate::input;

#[derive(Args)]
pub struct WaterfallArgs {
    /// Waterfall input JSON; defaults are used when omitted
    #[arg(long)]
    pub input: Option<String>,
    /// Override the prepayment speed multiplier (1.65 = 165% of the curve)
    #[arg(long)]
    pub speed: Option<Decimal>,
    /// Override the remaining term in months
    #[arg(long)]
    pub wam: Option<u32>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut wf_input: WaterfallInput = input::load(args.input.as_deref())?.unwrap_or_default();
    if let Some(speed) = args.speed {
        wf_input.psa_speed = PsaSpeed::Constant(speed);
    }
    if let Some(wam) = args.wam {
        wf_input.wam = wam;
    }
    let result = create_waterfall(&wf_input)?;
    Ok(serde_json::to_value(result)?)
}
