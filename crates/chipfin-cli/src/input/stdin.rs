use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Parse piped JSON from stdin, e.g. a facts array for `normalize`.
///
/// `None` when stdin is a terminal or nothing was piped.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse stdin as facts JSON: {}", e))?;
    Ok(Some(value))
}
