use clap::Args;
use serde_json::{json, Value};

use mbs_waterfall_core::collateral::{create_waterfall, WaterfallInput};
use mbs_waterfall_core::export::{export_schedule, FileSink, ScheduleRecord, EXPORT_FILENAME};

use crate::input;

#[derive(Args)]
pub struct ExportArgs {
    /// Schedule record JSON, or a waterfall input to project first
    #[arg(long)]
    pub input: Option<String>,
    /// Directory that receives data_result.csv
    #[arg(long, default_value = ".")]
    pub out_dir: String,
}

pub fn run_export(args: ExportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data: Value = input::load(args.input.as_deref())?.unwrap_or_else(|| json!({}));

    // A schedule record is recognised by its period column
    let record: ScheduleRecord = if data.get("periods").is_some() {
        serde_json::from_value(data)?
    } else {
        let wf_input: WaterfallInput = serde_json::from_value(data)?;
        create_waterfall(&wf_input)?.result.to_schedule_record()
    };

    let sink = FileSink::new(&args.out_dir);
    export_schedule(&record, &sink)?;

    Ok(json!({
        "path": sink.path_for(EXPORT_FILENAME).display().to_string(),
        "periods": record.len(),
    }))
}
