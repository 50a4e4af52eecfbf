//! Parsing of JSON and timestamp arguments.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::Path;

/// Parse an inline JSON argument. `what` names the flag in error messages.
pub fn parse_json(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("--{what} is not valid JSON"))
}

/// Parse an inline JSON argument that must be an object.
pub fn parse_json_object(text: &str, what: &str) -> Result<Map<String, Value>> {
    match parse_json(text, what)? {
        Value::Object(map) => Ok(map),
        other => bail!("--{what} must be a JSON object, got {other}"),
    }
}

/// Take a JSON document from an inline value or a file; exactly one is required.
pub fn json_from_inline_or_file(inline: Option<&str>, file: Option<&Path>, what: &str) -> Result<Value> {
    match (inline, file) {
        (Some(text), None) => parse_json(text, what),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
        }
        (Some(_), Some(_)) => bail!("Pass either --{what} or --{what}-file, not both"),
        (None, None) => bail!("One of --{what} or --{what}-file is required"),
    }
}

/// Build a context from an optional JSON object plus `key=value` pairs.
///
/// A pair's value is read as JSON when it parses, otherwise as a string, so
/// `tier=3` yields a number and `team=marketing` a string. Pairs override
/// keys from the JSON object.
pub fn build_context(json: Option<&str>, pairs: &[String]) -> Result<Map<String, Value>> {
    let mut context = match json {
        Some(text) => parse_json_object(text, "context")?,
        None => Map::new(),
    };

    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("Invalid --set value '{pair}', expected key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid --set value '{pair}', key is empty");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        context.insert(key.to_string(), value);
    }

    Ok(context)
}

/// clap value parser for RFC 3339 timestamps.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp such as 2026-01-01T00:00:00Z: {e}"))
}
