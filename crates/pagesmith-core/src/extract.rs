//! Two-stage extraction of an artifact set from model output.
//!
//! Stage 1 parses the whole reply as JSON. Only when that fails does stage 2
//! look for the first brace- or bracket-delimited span and parse that.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Relative file path → full file content.
pub type ArtifactSet = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("model returned an empty response")]
    Empty,

    #[error("no JSON object found in model output")]
    NoJson,

    #[error("JSON-like span found but could not be parsed: {0}")]
    Malformed(String),

    #[error("expected a JSON object mapping paths to contents, got {0}")]
    NotAnObject(&'static str),

    #[error("content for '{0}' is not a string")]
    NonStringContent(String),
}

static JSON_SPAN_RE: OnceLock<Regex> = OnceLock::new();

fn json_span_re() -> &'static Regex {
    JSON_SPAN_RE.get_or_init(|| Regex::new(r"(?s)(\{.*\}|\[.*\])").unwrap())
}

pub fn extract_artifacts(text: &str) -> Result<ArtifactSet, ExtractError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return into_artifacts(value);
    }

    let span = json_span_re()
        .find(trimmed)
        .ok_or(ExtractError::NoJson)?
        .as_str();
    let value = serde_json::from_str::<Value>(span)
        .map_err(|e| ExtractError::Malformed(e.to_string()))?;
    into_artifacts(value)
}

fn into_artifacts(value: Value) -> Result<ArtifactSet, ExtractError> {
    let map = match value {
        Value::Object(map) => map,
        Value::Array(_) => return Err(ExtractError::NotAnObject("an array")),
        Value::String(_) => return Err(ExtractError::NotAnObject("a string")),
        Value::Number(_) => return Err(ExtractError::NotAnObject("a number")),
        Value::Bool(_) => return Err(ExtractError::NotAnObject("a boolean")),
        Value::Null => return Err(ExtractError::NotAnObject("null")),
    };

    map.into_iter()
        .map(|(path, content)| match content {
            Value::String(s) => Ok((path, s)),
            _ => Err(ExtractError::NonStringContent(path)),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let set = extract_artifacts(r#"{"a.html": "<p>x</p>", "b.js": "y"}"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set["a.html"], "<p>x</p>");
        assert_eq!(set["b.js"], "y");
    }

    #[test]
    fn recovers_object_from_fenced_prose() {
        let text = "Sure! Here you go:\n```json\n{\"index.html\": \"<h1>{hi}</h1>\"}\n```\nEnjoy.";
        let set = extract_artifacts(text).unwrap();
        assert_eq!(set["index.html"], "<h1>{hi}</h1>");
    }

    #[test]
    fn prose_without_json_is_no_json() {
        assert_eq!(
            extract_artifacts("I cannot help with that."),
            Err(ExtractError::NoJson)
        );
    }

    #[test]
    fn empty_output_is_rejected() {
        assert_eq!(extract_artifacts("   \n"), Err(ExtractError::Empty));
    }

    #[test]
    fn broken_span_is_malformed() {
        let err = extract_artifacts("here: {\"a\": \"unterminated}").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }

    #[test]
    fn arrays_are_not_artifact_sets() {
        assert_eq!(
            extract_artifacts(r#"["index.html"]"#),
            Err(ExtractError::NotAnObject("an array"))
        );
        assert_eq!(
            extract_artifacts(r#"files: ["index.html"]"#),
            Err(ExtractError::NotAnObject("an array"))
        );
    }

    #[test]
    fn non_string_content_is_rejected() {
        assert_eq!(
            extract_artifacts(r#"{"index.html": "ok", "data.json": {"k": 1}}"#),
            Err(ExtractError::NonStringContent("data.json".into()))
        );
    }
}
