use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use mbs_waterfall_core::fixed_income::{floater_rates, spot_from_par, FloaterInput, ParYield};

use crate::input;

#[derive(Args)]
pub struct SpotCurveArgs {
    /// JSON array of {"maturity", "yield_pct"} par points
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct FloaterArgs {
    /// Index level (e.g. 0.05)
    #[arg(long)]
    pub index_rate: Decimal,
    #[arg(long, default_value = "0.75")]
    pub floater_size: Decimal,
    #[arg(long, default_value = "0.25")]
    pub inverse_size: Decimal,
    #[arg(long, default_value = "0.09")]
    pub available_coupon: Decimal,
    #[arg(long, default_value = "0.01")]
    pub margin: Decimal,
}

pub fn run_spot_curve(args: SpotCurveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let par: Vec<ParYield> = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for spot curve bootstrap")?;
    let result = spot_from_par(&par)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_floater(args: FloaterArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let result = floater_rates(&FloaterInput {
        floater_size: args.floater_size,
        inverse_size: args.inverse_size,
        available_coupon: args.available_coupon,
        margin: args.margin,
        index_rate: args.index_rate,
    })?;
    Ok(serde_json::to_value(result)?)
}
