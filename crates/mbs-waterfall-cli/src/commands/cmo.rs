use clap::Args;
use serde_json::Value;

use mbs_waterfall_core::cmo::{analyze_cmo, analyze_pac_support, CmoInput, PacInput};

use crate::input;

#[derive(Args)]
pub struct CmoArgs {
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct PacArgs {
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_cmo(args: CmoArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cmo_input: CmoInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for CMO structuring")?;
    let result = analyze_cmo(&cmo_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_pac(args: PacArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pac_input: PacInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for PAC/support analysis")?;
    let result = analyze_pac_support(&pac_input)?;
    Ok(serde_json::to_value(result)?)
}
