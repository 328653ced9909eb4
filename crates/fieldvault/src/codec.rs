//! Codec pipeline: a serializer composed with an optional transform.
//!
//! Write path: `transform.encode(serializer.dump(value))`.
//! Read path: `serializer.load(transform.decode(wire))`.
//!
//! `Value::Null` short-circuits in both directions — a null value never
//! reaches the serializer or the transform and round-trips to null.
//!
//! Pipelines are pure and deterministic. Failures are reported as
//! [`CodecError`] and never silently coerced; the proxy attaches the
//! attribute name when surfacing them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Errors from encoding or decoding an attribute value.
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    /// The identity serializer was handed a non-string value.
    #[error("identity serializer requires a string value, got {0}")]
    NotAString(&'static str),

    /// The serializer could not turn the value into a wire string.
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// The wire string could not be turned back into a value.
    #[error("deserialization failed: {0}")]
    Deserialize(String),

    /// A custom transform rejected its input.
    #[error("transform failed: {0}")]
    Transform(String),
}

/// A caller-supplied bidirectional mapping between a typed value and its
/// string representation.
pub trait ValueSerializer: Send + Sync {
    /// Serialize `value` to a wire string.
    fn dump(&self, value: &Value) -> Result<String, CodecError>;

    /// Deserialize a wire string back into a value.
    fn load(&self, wire: &str) -> Result<Value, CodecError>;
}

/// Closed set of serializers an attribute may declare.
#[derive(Clone)]
pub enum Serializer {
    /// String passthrough. Non-string values are a [`CodecError::NotAString`].
    Identity,
    /// JSON text via `serde_json`.
    Json,
    /// Caller-supplied serializer object.
    Custom(Arc<dyn ValueSerializer>),
}

impl Serializer {
    fn dump(&self, value: &Value) -> Result<String, CodecError> {
        match self {
            Serializer::Identity => match value {
                Value::String(s) => Ok(s.clone()),
                other => Err(CodecError::NotAString(json_type_name(other))),
            },
            Serializer::Json => {
                serde_json::to_string(value).map_err(|e| CodecError::Serialize(e.to_string()))
            }
            Serializer::Custom(custom) => custom.dump(value),
        }
    }

    fn load(&self, wire: &str) -> Result<Value, CodecError> {
        match self {
            Serializer::Identity => Ok(Value::String(wire.to_owned())),
            Serializer::Json => {
                serde_json::from_str(wire).map_err(|e| CodecError::Deserialize(e.to_string()))
            }
            Serializer::Custom(custom) => custom.load(wire),
        }
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Serializer::Identity => f.write_str("Identity"),
            Serializer::Json => f.write_str("Json"),
            Serializer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A pure function applied to the serialized string.
type TransformFn = Arc<dyn Fn(&str) -> Result<String, CodecError> + Send + Sync>;

/// A bidirectional pair of pure transform functions, applied after
/// serialization on write and before deserialization on read.
#[derive(Clone)]
pub struct Transform {
    encode: TransformFn,
    decode: TransformFn,
}

impl Transform {
    /// Build a transform from an encode/decode function pair.
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&str) -> Result<String, CodecError> + Send + Sync + 'static,
        D: Fn(&str) -> Result<String, CodecError> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// The composed serializer + transform stored in an attribute descriptor.
///
/// Resolved once at declaration time; never re-dispatched per call.
#[derive(Debug, Clone)]
pub struct CodecPipeline {
    serializer: Serializer,
    transform: Option<Transform>,
}

impl CodecPipeline {
    /// Compose a serializer with an optional transform.
    pub fn new(serializer: Serializer, transform: Option<Transform>) -> Self {
        Self {
            serializer,
            transform,
        }
    }

    /// The default pipeline: string passthrough, no transform.
    pub fn identity() -> Self {
        Self::new(Serializer::Identity, None)
    }

    /// Encode a value into the wire string handed to the transit backend.
    ///
    /// Returns `None` for `Value::Null` without invoking the serializer or
    /// transform.
    pub fn encode(&self, value: &Value) -> Result<Option<String>, CodecError> {
        if value.is_null() {
            return Ok(None);
        }
        let serialized = self.serializer.dump(value)?;
        match &self.transform {
            Some(t) => (t.encode)(&serialized).map(Some),
            None => Ok(Some(serialized)),
        }
    }

    /// Decode a wire string returned by the transit backend.
    ///
    /// `None` decodes to `Value::Null` without invoking the transform or
    /// serializer.
    pub fn decode(&self, wire: Option<&str>) -> Result<Value, CodecError> {
        let Some(wire) = wire else {
            return Ok(Value::Null);
        };
        let serialized = match &self.transform {
            Some(t) => (t.decode)(wire)?,
            None => wire.to_owned(),
        };
        self.serializer.load(&serialized)
    }
}

impl Default for CodecPipeline {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bracketing_transform() -> Transform {
        Transform::new(
            |raw| Ok(format!("xxx{raw}xxx")),
            |raw| {
                raw.strip_prefix("xxx")
                    .and_then(|r| r.strip_suffix("xxx"))
                    .map(str::to_owned)
                    .ok_or_else(|| CodecError::Transform("missing xxx brackets".into()))
            },
        )
    }

    #[test]
    fn identity_round_trip() {
        let codec = CodecPipeline::identity();
        let wire = codec.encode(&json!("blue")).unwrap();
        assert_eq!(wire.as_deref(), Some("blue"));
        assert_eq!(codec.decode(wire.as_deref()).unwrap(), json!("blue"));
    }

    #[test]
    fn identity_rejects_non_string() {
        let codec = CodecPipeline::identity();
        let err = codec.encode(&json!(42)).unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn json_round_trip() {
        let codec = CodecPipeline::new(Serializer::Json, None);
        let value = json!({"street": "1 Main St", "zip": "02134"});
        let wire = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(wire.as_deref()).unwrap(), value);
    }

    #[test]
    fn json_rejects_malformed_wire() {
        let codec = CodecPipeline::new(Serializer::Json, None);
        assert!(codec.decode(Some("{not json")).is_err());
    }

    #[test]
    fn null_short_circuits_both_directions() {
        // A transform that would fail on any input proves the short-circuit.
        let poison = Transform::new(
            |_| Err(CodecError::Transform("must not run".into())),
            |_| Err(CodecError::Transform("must not run".into())),
        );
        let codec = CodecPipeline::new(Serializer::Identity, Some(poison));
        assert_eq!(codec.encode(&Value::Null).unwrap(), None);
        assert_eq!(codec.decode(None).unwrap(), Value::Null);
    }

    #[test]
    fn transform_composes_after_serializer() {
        let codec = CodecPipeline::new(Serializer::Identity, Some(bracketing_transform()));
        let wire = codec.encode(&json!("blue")).unwrap();
        assert_eq!(wire.as_deref(), Some("xxxbluexxx"));
        assert_eq!(codec.decode(wire.as_deref()).unwrap(), json!("blue"));
    }

    #[test]
    fn transform_decode_failure_surfaces() {
        let codec = CodecPipeline::new(Serializer::Identity, Some(bracketing_transform()));
        let err = codec.decode(Some("no-brackets")).unwrap_err();
        assert!(matches!(err, CodecError::Transform(_)));
    }

    #[test]
    fn custom_serializer_round_trip() {
        struct CommaList;
        impl ValueSerializer for CommaList {
            fn dump(&self, value: &Value) -> Result<String, CodecError> {
                let items = value
                    .as_array()
                    .ok_or_else(|| CodecError::Serialize("expected array".into()))?;
                let parts: Result<Vec<&str>, CodecError> = items
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .ok_or_else(|| CodecError::Serialize("expected string items".into()))
                    })
                    .collect();
                Ok(parts?.join(","))
            }

            fn load(&self, wire: &str) -> Result<Value, CodecError> {
                Ok(Value::Array(
                    wire.split(',').map(|s| Value::String(s.into())).collect(),
                ))
            }
        }

        let codec = CodecPipeline::new(Serializer::Custom(Arc::new(CommaList)), None);
        let value = json!(["alpha", "beta"]);
        let wire = codec.encode(&value).unwrap();
        assert_eq!(wire.as_deref(), Some("alpha,beta"));
        assert_eq!(codec.decode(wire.as_deref()).unwrap(), value);
    }

    #[test]
    fn full_stack_round_trip_with_json_and_transform() {
        let codec = CodecPipeline::new(Serializer::Json, Some(bracketing_transform()));
        let value = json!({"a": [1, 2, 3]});
        let wire = codec.encode(&value).unwrap();
        assert!(wire.as_deref().unwrap().starts_with("xxx"));
        assert_eq!(codec.decode(wire.as_deref()).unwrap(), value);
    }
}
