//! Schema-less chat-completion request payload.
//!
//! The relay only understands two fields of the request body: `model` and
//! `stream`. Everything else is carried through untouched, in its original
//! key order, when the body is re-serialized for an attempt.

use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding the requested model identifier.
pub const MODEL_KEY: &str = "model";

/// Key holding the streaming flag.
pub const STREAM_KEY: &str = "stream";

/// Errors raised while decoding an inbound request body.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The body is not valid JSON.
    #[error("invalid json body: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is valid JSON but not an object.
    #[error("request body must be a JSON object")]
    NotAnObject,
}

/// An arbitrary JSON object with typed, fail-closed accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPayload {
    fields: Map<String, Value>,
}

impl RequestPayload {
    /// Decode a request body.
    ///
    /// A literal `null` decodes to an empty object, so it is later rejected
    /// for lacking a model rather than for being malformed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::default()),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// Returns the string value for `key`, or `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Reads `key` as a boolean with permissive coercion.
    ///
    /// Booleans are taken as-is, numbers are true when non-zero and strings
    /// are true for `true`, `1`, `yes` or `on` (trimmed, any case). Anything
    /// else, including an absent key, is false.
    pub fn get_bool(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
            Some(Value::String(text)) => {
                let normalized = text.trim().to_ascii_lowercase();
                matches!(normalized.as_str(), "true" | "1" | "yes" | "on")
            }
            _ => false,
        }
    }

    /// The requested model, trimmed. `None` when missing, not a string, or blank.
    pub fn model(&self) -> Option<&str> {
        self.get_str(MODEL_KEY)
            .map(str::trim)
            .filter(|model| !model.is_empty())
    }

    /// Whether the caller asked for a streamed response.
    pub fn is_stream(&self) -> bool {
        self.get_bool(STREAM_KEY)
    }

    /// Serialize the payload with `model` replaced by `model`.
    ///
    /// All other fields keep their position and value. When the payload had
    /// no `model` key, it is appended.
    pub fn with_model(&self, model: &str) -> Result<Vec<u8>, serde_json::Error> {
        let mut fields = self.fields.clone();
        fields.insert(MODEL_KEY.to_string(), Value::String(model.to_string()));
        serde_json::to_vec(&fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: &Value) -> RequestPayload {
        RequestPayload::from_slice(value.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn test_model_is_trimmed() {
        let p = payload(&json!({"model": "  gpt-4o \t"}));
        assert_eq!(p.model(), Some("gpt-4o"));
    }

    #[test]
    fn test_model_missing_blank_or_wrong_type() {
        assert_eq!(payload(&json!({})).model(), None);
        assert_eq!(payload(&json!({"model": "   "})).model(), None);
        assert_eq!(payload(&json!({"model": 42})).model(), None);
        assert_eq!(payload(&json!({"model": null})).model(), None);
    }

    #[test]
    fn test_stream_flag_coercion() {
        let truthy = [
            json!(true),
            json!(1),
            json!(0.5),
            json!("true"),
            json!(" YES "),
            json!("On"),
            json!("1"),
        ];
        for value in truthy {
            assert!(payload(&json!({ "stream": value })).is_stream(), "{value}");
        }

        let falsy = [
            json!(false),
            json!(0),
            json!("false"),
            json!("no"),
            json!("2"),
            json!(null),
            json!([true]),
            json!({"enabled": true}),
        ];
        for value in falsy {
            assert!(!payload(&json!({ "stream": value })).is_stream(), "{value}");
        }

        assert!(!payload(&json!({"model": "m"})).is_stream());
    }

    #[test]
    fn test_with_model_preserves_other_fields_and_order() {
        let raw = br#"{"temperature":0.2,"model":"m1","messages":[{"role":"user","content":"hi"}],"stream":true}"#;
        let p = RequestPayload::from_slice(raw).unwrap();

        let rewritten = p.with_model("m2").unwrap();
        assert_eq!(
            String::from_utf8(rewritten).unwrap(),
            r#"{"temperature":0.2,"model":"m2","messages":[{"role":"user","content":"hi"}],"stream":true}"#
        );

        // The original payload is left untouched.
        assert_eq!(p.model(), Some("m1"));
    }

    #[test]
    fn test_non_object_bodies_are_rejected() {
        assert!(matches!(
            RequestPayload::from_slice(b"[1,2]"),
            Err(PayloadError::NotAnObject)
        ));
        assert!(matches!(
            RequestPayload::from_slice(b"\"model\""),
            Err(PayloadError::NotAnObject)
        ));
        assert!(matches!(
            RequestPayload::from_slice(b"{not json"),
            Err(PayloadError::Json(_))
        ));
    }

    #[test]
    fn test_null_body_has_no_model() {
        let p = RequestPayload::from_slice(b"null").unwrap();
        assert_eq!(p.model(), None);
    }
}
