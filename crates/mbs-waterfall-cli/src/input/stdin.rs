use serde_json::Value;
use std::io::{self, Read};

/// Read a JSON request piped on stdin. `None` when stdin is a terminal or
/// the pipe is empty, so commands fall back to their flags.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    tracing::debug!(bytes = buffer.len(), "read request from stdin");
    parse_request(&buffer)
}

fn parse_request(text: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| format!("stdin is not a valid JSON request: {e}").into())
}
