//! Turns free-form model completions into JSON payloads.
//!
//! Models are asked to answer in JSON but routinely wrap it in prose or a
//! fenced code block. Extraction tries, in order:
//!
//! 1. the body of the first "```json" fence,
//! 2. the body of the first "```" fence,
//! 3. the whole trimmed text.
//!
//! A candidate that does not parse to a JSON object yields the caller's
//! fallback value with `error` and `raw_response` filled in. Nothing here
//! returns an error: every path produces a value of the fallback's shape.

use serde_json::{Map, Value};

/// Diagnostic written to `error` when the completion holds no usable JSON.
pub const PARSE_FAILURE: &str = "Failed to parse AI response";

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Pick the substring of `raw` most likely to contain the JSON payload.
pub fn extract_candidate(raw: &str) -> &str {
    let text = raw.trim();
    let body = if let Some(start) = text.find(JSON_FENCE) {
        &text[start + JSON_FENCE.len()..]
    } else if let Some(start) = text.find(FENCE) {
        &text[start + FENCE.len()..]
    } else {
        return text;
    };
    let end = body.find(FENCE).unwrap_or(body.len());
    body[..end].trim()
}

/// Parse a model completion, or fall back.
///
/// The parsed object is returned verbatim; it is not checked against the
/// shape the prompt asked for.
pub fn normalize(raw: &str, fallback: &Value) -> Value {
    match serde_json::from_str::<Value>(extract_candidate(raw)) {
        Ok(value @ Value::Object(_)) => value,
        _ => with_error(fallback, PARSE_FAILURE, Some(raw)),
    }
}

/// Fallback for a model call that never produced text.
///
/// `error` carries the failure reason and `raw_response` is omitted.
pub fn upstream_failure(fallback: &Value, reason: &str) -> Value {
    with_error(fallback, reason, None)
}

fn with_error(fallback: &Value, error: &str, raw: Option<&str>) -> Value {
    let mut body = match fallback {
        Value::Object(fields) => fields.clone(),
        _ => Map::new(),
    };
    body.insert("error".to_string(), Value::String(error.to_string()));
    match raw {
        Some(raw) => {
            body.insert("raw_response".to_string(), Value::String(raw.to_string()));
        }
        None => {
            body.remove("raw_response");
        }
    }
    Value::Object(body)
}
