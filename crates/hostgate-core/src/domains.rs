//! Control-plane payload parsing.
//!
//! Expected body: a JSON array of objects exposing a `name` string, e.g.
//! `[{"name":"a.com"},{"name":"b.com"}]`. Extra fields are ignored.
//!
//! Skip policy: an entry that is not an object, lacks `name`, carries a
//! non-string `name`, or whose `name` is blank is skipped on its own. Only a
//! body that is not a JSON array fails the whole refresh.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{HostGateError, Result};

#[derive(Debug, Deserialize)]
struct DomainRecord {
    name: String,
}

/// Result of parsing one refresh payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDomains {
    /// Names in payload order (not yet normalized).
    pub domains: Vec<String>,
    /// Number of entries rejected by the skip policy.
    pub skipped: usize,
}

/// Parse a control-plane response body.
pub fn parse_domains(body: &[u8]) -> Result<ParsedDomains> {
    let entries: Vec<Value> = match serde_json::from_slice(body) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            return Err(HostGateError::Parse(format!(
                "expected a JSON array, got {}",
                json_type(&other)
            )))
        }
        Err(e) => return Err(HostGateError::Parse(format!("invalid json: {e}"))),
    };

    let mut out = ParsedDomains {
        domains: Vec::with_capacity(entries.len()),
        skipped: 0,
    };
    for entry in entries {
        match serde_json::from_value::<DomainRecord>(entry) {
            Ok(rec) if !rec.name.trim().is_empty() => out.domains.push(rec.name),
            _ => out.skipped += 1,
        }
    }
    Ok(out)
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
