use clap::Args;
use serde_json::Value;

use mbs_waterfall_core::collateral::{arm_coupons, po_io_split, ArmCouponInput, PoIoInput};

use crate::input;

#[derive(Args)]
pub struct PoIoArgs {
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct ArmArgs {
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_po_io(args: PoIoArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let split_input: PoIoInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for PO/IO split")?;
    let result = po_io_split(&split_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_arm(args: ArmArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let arm_input: ArmCouponInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for ARM coupon resets")?;
    let result = arm_coupons(&arm_input)?;
    Ok(serde_json::to_value(result)?)
}
