use serde_json::Value;

/// Render a command result as indented JSON. Decimal fields are already
/// strings, so precision survives the round trip.
pub fn render_json(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

pub fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    let text = render_json(value)?;
    tracing::trace!(bytes = text.len(), "writing JSON output");
    println!("{text}");
    Ok(())
}
