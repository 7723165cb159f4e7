//! Response framing.
//!
//! Some endpoints (job listing in particular) wrap their JSON in a single
//! pair of parentheses. The framing is stripped before decoding.

use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::ProtocolError;

/// Strip one layer of `( ... )` framing, if present.
pub fn strip_parens(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => inner,
        None => trimmed,
    }
}

/// Decode a response body as JSON, tolerating paren framing.
pub fn load_json(content: &str) -> Result<Value, ProtocolError> {
    serde_json::from_str(strip_parens(content))
        .map_err(|e| ProtocolError::Malformed(format!("{}: {}", e, preview(content))))
}

/// Decode a response body as an envelope.
pub fn parse_envelope(content: &str) -> Result<Envelope, ProtocolError> {
    let value = load_json(content)?;
    Ok(serde_json::from_value(value)?)
}

fn preview(content: &str) -> String {
    const MAX: usize = 80;
    let trimmed = content.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
