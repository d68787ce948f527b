//! Decoding of the forward proxy's newline-delimited JSON status stream.
//!
//! Each line of the proxy's diagnostic output is one JSON object such as
//! `{"type":"bundle:fail","id":"3","error":{"msg":"boom"}}`. Decoding never
//! panics: unparseable lines become a [`DecodeError`] that carries the raw
//! line, and unrecognised `type` values become [`StatusEvent::Unknown`].

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Wire value of [`StatusEvent::BundleStart`].
pub const BUNDLE_START: &str = "bundle:start";
/// Wire value of [`StatusEvent::BundleSuccess`].
pub const BUNDLE_SUCCESS: &str = "bundle:success";
/// Wire value of [`StatusEvent::BundleFail`].
pub const BUNDLE_FAIL: &str = "bundle:fail";

/// Bundle identifier as it appeared on the wire.
///
/// The JSON type is part of the identity: `"42"` and `42` are different bundles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BundleId {
    /// A JSON string id (a missing id is the empty string).
    Text(String),
    /// Any other JSON value, kept as its JSON text.
    Json(String),
}

impl BundleId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Json(s) => s,
        }
    }
}

impl Default for BundleId {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for BundleId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed event decoded from one diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// The bundler started a new bundle.
    BundleStart { id: BundleId },
    /// The bundle finished successfully.
    BundleSuccess { id: BundleId },
    /// The bundle failed, optionally with the bundler's error message.
    BundleFail {
        id: BundleId,
        error_message: Option<String>,
    },
    /// Any `type` the supervisor does not understand.
    Unknown { kind: String },
}

/// A line that could not be turned into a [`StatusEvent`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot parse log line as JSON: {line}\n\n{reason}")]
pub struct DecodeError {
    /// The offending line, trimmed.
    pub line: String,
    /// Parser error text.
    pub reason: String,
}

/// Shape of a status line on the wire.
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type", default)]
    kind: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Decode one line of the diagnostic stream.
pub fn decode(line: &str) -> Result<StatusEvent, DecodeError> {
    let line = line.trim();
    let fail = |reason: String| DecodeError {
        line: line.to_string(),
        reason,
    };

    let value: Value = serde_json::from_str(line).map_err(|e| fail(e.to_string()))?;
    if !value.is_object() {
        return Err(fail(format!("expected a JSON object, found {}", kind_of(&value))));
    }
    let wire: WireEvent = serde_json::from_value(value).map_err(|e| fail(e.to_string()))?;

    let id = wire.id.as_ref().map(render_id).unwrap_or_default();
    let event = match wire.kind {
        Some(Value::String(kind)) => match kind.as_str() {
            BUNDLE_START => StatusEvent::BundleStart { id },
            BUNDLE_SUCCESS => StatusEvent::BundleSuccess { id },
            BUNDLE_FAIL => StatusEvent::BundleFail {
                id,
                error_message: wire
                    .error
                    .as_ref()
                    .and_then(|e| e.get("msg"))
                    .and_then(Value::as_str)
                    .filter(|msg| !msg.is_empty())
                    .map(str::to_string),
            },
            _ => StatusEvent::Unknown { kind },
        },
        Some(other) => StatusEvent::Unknown {
            kind: other.to_string(),
        },
        None => StatusEvent::Unknown {
            kind: String::new(),
        },
    };

    Ok(event)
}

/// Ids are normally strings; numeric ids keep their JSON type.
fn render_id(value: &Value) -> BundleId {
    match value {
        Value::String(s) => BundleId::Text(s.clone()),
        Value::Null => BundleId::default(),
        other => BundleId::Json(other.to_string()),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bundle_lifecycle() {
        assert_eq!(
            decode(r#"{"type":"bundle:start","id":"1"}"#),
            Ok(StatusEvent::BundleStart { id: "1".into() })
        );
        assert_eq!(
            decode(r#"{"type":"bundle:success","id":"1"}"#),
            Ok(StatusEvent::BundleSuccess { id: "1".into() })
        );
        assert_eq!(
            decode(r#"{"type":"bundle:fail","id":"1","error":{"msg":"boom"}}"#),
            Ok(StatusEvent::BundleFail {
                id: "1".into(),
                error_message: Some("boom".into()),
            })
        );
    }

    #[test]
    fn test_decode_fail_without_message() {
        assert_eq!(
            decode(r#"{"type":"bundle:fail","id":"7"}"#),
            Ok(StatusEvent::BundleFail {
                id: "7".into(),
                error_message: None,
            })
        );
        assert_eq!(
            decode(r#"{"type":"bundle:fail","id":"7","error":{"msg":""}}"#),
            Ok(StatusEvent::BundleFail {
                id: "7".into(),
                error_message: None,
            })
        );
    }

    #[test]
    fn test_fail_with_non_object_error_uses_no_message() {
        assert_eq!(
            decode(r#"{"type":"bundle:fail","id":"7","error":"exploded"}"#),
            Ok(StatusEvent::BundleFail {
                id: "7".into(),
                error_message: None,
            })
        );
    }

    #[test]
    fn test_decode_trims_whitespace() {
        assert_eq!(
            decode("  {\"type\":\"bundle:start\",\"id\":\"a\"}\r"),
            Ok(StatusEvent::BundleStart { id: "a".into() })
        );
    }

    #[test]
    fn test_numeric_id_keeps_json_type() {
        assert_eq!(
            decode(r#"{"type":"bundle:start","id":42}"#),
            Ok(StatusEvent::BundleStart {
                id: BundleId::Json("42".into())
            })
        );
        assert_ne!(
            decode(r#"{"type":"bundle:start","id":42}"#),
            decode(r#"{"type":"bundle:start","id":"42"}"#)
        );
    }

    #[test]
    fn test_missing_id_is_empty() {
        assert_eq!(
            decode(r#"{"type":"bundle:success"}"#),
            Ok(StatusEvent::BundleSuccess {
                id: BundleId::default()
            })
        );
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            decode(r#"{"type":"proxy:listening","id":"1"}"#),
            Ok(StatusEvent::Unknown {
                kind: "proxy:listening".into()
            })
        );
        assert_eq!(
            decode(r#"{"id":"1"}"#),
            Ok(StatusEvent::Unknown {
                kind: String::new()
            })
        );
        assert_eq!(
            decode(r#"{"type":3}"#),
            Ok(StatusEvent::Unknown { kind: "3".into() })
        );
    }

    #[test]
    fn test_malformed_line() {
        let err = decode("{not json").unwrap_err();
        assert_eq!(err.line, "{not json");
        assert!(!err.reason.is_empty());
        assert!(err.to_string().starts_with("Cannot parse log line as JSON: {not json"));
    }

    #[test]
    fn test_empty_line_is_malformed() {
        assert!(decode("   ").is_err());
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        let err = decode("null").unwrap_err();
        assert!(err.reason.contains("null"));
        assert!(decode("[1,2]").is_err());
        assert!(decode("\"bundle:start\"").is_err());
    }
}
