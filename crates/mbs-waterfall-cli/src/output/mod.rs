pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Write a command's result envelope to stdout in the selected format.
pub fn format_output(format: &OutputFormat, value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!(format = ?format, "formatting command output");
    match format {
        OutputFormat::Json => json::print_json(value)?,
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
    Ok(())
}
