use canonical_json::to_string;
use serde::Serialize;
use serde_json::Value;

use std::fmt;

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug)]
pub enum CanonicalizationError {
    /// Input could not be converted into a JSON tree.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// Non-finite number (NaN/Infinity) detected.
    #[error("non-finite number detected at {0}")]
    NonFiniteNumber(String),
    /// Generic failure from the RFC 8785 encoder.
    #[error("other error: {0}")]
    Other(String),
}

/// Helper for building JSON paths during validation.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// Canonicalizer that emits deterministic, whitespace-free, key-sorted bytes.
///
/// The same canonicalizer feeds event signing, ledger hashing and context
/// fingerprints, so a signed event hashed today hashes identically when the
/// chain is re-verified later.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canonicalizer;

impl Canonicalizer {
    /// Creates a new canonicalizer.
    pub fn new() -> Self {
        Self
    }

    /// Produces canonical bytes for a JSON value.
    pub fn canonicalize(&self, value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
        self.validate(value, Path::root())?;

        // RFC 8785: sorted members, no insignificant whitespace
        let canonical =
            to_string(value).map_err(|err| CanonicalizationError::Other(err.to_string()))?;
        Ok(canonical.into_bytes())
    }

    /// Serializes `value` to a JSON tree and canonicalizes it.
    pub fn canonicalize_serializable<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, CanonicalizationError> {
        let tree = serde_json::to_value(value)
            .map_err(|err| CanonicalizationError::Serialization(err.to_string()))?;
        self.canonicalize(&tree)
    }

    /// Canonical form as a UTF-8 string, for display and tooling.
    pub fn canonicalize_to_string(&self, value: &Value) -> Result<String, CanonicalizationError> {
        let bytes = self.canonicalize(value)?;
        String::from_utf8(bytes).map_err(|err| CanonicalizationError::Other(err.to_string()))
    }

    #[allow(clippy::only_used_in_recursion)]
    fn validate(&self, value: &Value, path: Path) -> Result<(), CanonicalizationError> {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.validate(child, path.push_field(key))?;
                }
                Ok(())
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    self.validate(item, path.push_index(idx))?;
                }
                Ok(())
            }
            Value::Number(num) => {
                if let Some(f) = num.as_f64() {
                    if num.is_f64() && !f.is_finite() {
                        return Err(CanonicalizationError::NonFiniteNumber(path.to_string()));
                    }
                }
                Ok(())
            }
            Value::String(_) | Value::Bool(_) | Value::Null => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_keys_and_strips_whitespace() {
        let bytes = Canonicalizer::new()
            .canonicalize(&json!({"b": 1, "a": {"z": true, "y": [1, 2]}}))
            .unwrap();
        assert_eq!(bytes, br#"{"a":{"y":[1,2],"z":true},"b":1}"#.to_vec());
    }

    #[test]
    fn canonical_string_is_stable_across_insertion_order() {
        let c = Canonicalizer::new();
        let mut first = serde_json::Map::new();
        first.insert("trace_id".into(), json!("T1"));
        first.insert("agent_id".into(), json!("agent"));
        let mut second = serde_json::Map::new();
        second.insert("agent_id".into(), json!("agent"));
        second.insert("trace_id".into(), json!("T1"));
        assert_eq!(
            c.canonicalize_to_string(&Value::Object(first)).unwrap(),
            c.canonicalize_to_string(&Value::Object(second)).unwrap()
        );
    }

    #[test]
    fn serializable_matches_value_form() {
        #[derive(Serialize)]
        struct Sample {
            zeta: u8,
            alpha: &'static str,
        }
        let c = Canonicalizer::new();
        let direct = c
            .canonicalize_serializable(&Sample {
                zeta: 3,
                alpha: "x",
            })
            .unwrap();
        let via_value = c.canonicalize(&json!({"alpha": "x", "zeta": 3})).unwrap();
        assert_eq!(direct, via_value);
    }
}
