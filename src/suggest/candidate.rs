//! Defensive parsing of the LLM's JSON answer.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::parse::normalize_whitespace;

/// Confidence used when the model omits one.
const DEFAULT_CONFIDENCE: u8 = 70;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("fence pattern must compile")
});

/// A parsed, not yet validated, agentic suggestion.
#[derive(Debug, Clone, PartialEq)]
pub struct AgenticCandidate {
    pub command: String,
    pub confidence: u8,
    pub rationale: String,
    pub assumptions: Vec<String>,
    pub warnings: Vec<String>,
}

/// Parse model output. Tries, in order: the whole text as JSON, a fenced
/// ```json block, and the span from the first `{` to the last `}`.
///
/// Errors are human-readable warnings for the response.
pub fn parse_candidate(text: &str) -> Result<AgenticCandidate, String> {
    let object = extract_object(text).ok_or_else(|| "LLM response was not valid JSON".to_string())?;

    let command = object
        .get("command")
        .and_then(Value::as_str)
        .map(normalize_whitespace)
        .unwrap_or_default();
    if !command.starts_with("kubectl ") {
        return Err(format!(
            "LLM suggestion discarded: not a kubectl command ({})",
            if command.is_empty() { "<empty>" } else { command.as_str() }
        ));
    }

    Ok(AgenticCandidate {
        command,
        confidence: confidence(object.get("confidence")),
        rationale: object
            .get("rationale")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        assumptions: string_list(object.get("assumptions")),
        warnings: string_list(object.get("warnings")),
    })
}

fn extract_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = text.trim();
    if let Some(obj) = as_object(trimmed) {
        return Some(obj);
    }
    if let Some(obj) = FENCED_JSON
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| as_object(m.as_str()))
    {
        return Some(obj);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    as_object(&trimmed[start..=end])
}

fn as_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Accepts integers, floats and numeric strings. Values strictly between 0
/// and 1 are read as fractions.
fn confidence(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    let Some(mut v) = raw.filter(|v| v.is_finite()) else {
        return DEFAULT_CONFIDENCE;
    };
    if v > 0.0 && v < 1.0 {
        v *= 100.0;
    }
    v.round().clamp(0.0, 100.0) as u8
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}
