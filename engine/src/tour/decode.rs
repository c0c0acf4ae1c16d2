//! Tolerant decoding of structured backend replies
//!
//! Generation backends are asked for a bare JSON object but routinely wrap it
//! in a markdown fence or surround it with prose. Decoding walks a fixed
//! ladder and stops at the first stage that yields an object:
//!
//! 1. strict: the whole reply is a JSON object
//! 2. unfenced: the body of the first code fence is a JSON object
//! 3. extracted: the first balanced `{ ... }` in the reply is a JSON object
//!
//! If every stage fails the caller gets a `DecodeError` naming the stages
//! that were attempted.

use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// JSON object produced by a successful decode.
pub type JsonObject = Map<String, Value>;

/// Decoding stage, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Strict,
    Unfenced,
    Extracted,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStage::Strict => write!(f, "strict"),
            DecodeStage::Unfenced => write!(f, "unfenced"),
            DecodeStage::Extracted => write!(f, "extracted"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no JSON object found (tried {}): {detail}", describe_stages(.attempted))]
pub struct DecodeError {
    /// Stages that were actually attempted before giving up
    pub attempted: Vec<DecodeStage>,
    /// Error reported by the strict stage
    pub detail: String,
}

fn describe_stages(stages: &[DecodeStage]) -> String {
    stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)```").ok())
        .as_ref()
}

/// Decode a backend reply into a JSON object.
pub fn decode_object(raw: &str) -> Result<JsonObject, DecodeError> {
    let trimmed = raw.trim();
    let mut attempted = vec![DecodeStage::Strict];

    let detail = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => format!("expected an object, found {}", json_kind(&other)),
        Err(e) => e.to_string(),
    };

    if let Some(body) = unfence(trimmed) {
        attempted.push(DecodeStage::Unfenced);
        if let Some(map) = parse_object(body) {
            tracing::debug!("Decoded reply after stripping code fence");
            return Ok(map);
        }
    }

    let mut from = 0;
    while let Some(pos) = trimmed[from..].find('{').map(|offset| from + offset) {
        if let Some(candidate) = extract_balanced(&trimmed[pos..]) {
            if !attempted.contains(&DecodeStage::Extracted) {
                attempted.push(DecodeStage::Extracted);
            }
            if let Some(map) = parse_object(candidate) {
                tracing::debug!("Decoded reply from embedded object at byte {}", pos);
                return Ok(map);
            }
        }
        from = pos + 1;
    }

    Err(DecodeError { attempted, detail })
}

fn parse_object(s: &str) -> Option<JsonObject> {
    match serde_json::from_str::<Value>(s.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Body of the first fenced block, without the language tag line.
fn unfence(content: &str) -> Option<&str> {
    fence_pattern()?
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|body| !body.trim().is_empty())
}

/// Balanced `{ ... }` at the start of `s`, honouring string literals.
fn extract_balanced(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
