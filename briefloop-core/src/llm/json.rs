//! Lenient JSON extraction from model responses

use anyhow::{anyhow, Result};
use serde_json::Value;

/// Pull a JSON value out of model text.
///
/// Tries, in order: the first fenced code block (optionally tagged `json`),
/// the span from the first `{` to the last `}`, then the whole trimmed text.
pub fn extract_json(text: &str) -> Result<Value> {
    if let Some(block) = fenced_block(text) {
        if let Ok(value) = serde_json::from_str(block) {
            return Ok(value);
        }
    }

    if let Some(span) = brace_span(text) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    serde_json::from_str(text.trim())
        .map_err(|_| anyhow!("Could not extract valid JSON from response"))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
