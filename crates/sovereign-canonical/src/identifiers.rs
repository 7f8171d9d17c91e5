use crate::validation::ValidationError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype {
    ($name:ident, $field:expr, $doc:expr, $pattern:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new instance without validation; callers are responsible for conformity.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Parses a validated identifier from a string.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                Self::check(&s)?;
                Ok(Self(s))
            }

            /// Re-checks a value built with [`Self::new`] or deserialized unchecked.
            pub fn validate(&self) -> Result<(), ValidationError> {
                Self::check(&self.0)
            }

            fn check(s: &str) -> Result<(), ValidationError> {
                if s.is_empty() {
                    return Err(ValidationError::MissingField { field: $field });
                }
                if !Regex::new($pattern).expect("invalid regex").is_match(s) {
                    return Err(ValidationError::PatternMismatch {
                        field: $field,
                        value: s.to_string(),
                    });
                }
                Ok(())
            }

            /// Borrows the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    TraceId,
    "trace_id",
    "Correlation identifier spanning every event of one logical request.",
    r"^[A-Za-z0-9._:-]{1,128}$"
);
newtype!(
    AgentId,
    "agent_id",
    "Identifier of the component that emitted an event (e.g. `reward_engine`).",
    r"^[A-Za-z0-9._:-]{1,128}$"
);
newtype!(
    Jurisdiction,
    "jurisdiction",
    "Jurisdiction label for the event context, or `global`.",
    r"^[A-Za-z][A-Za-z0-9 _-]{0,63}$"
);
newtype!(
    KeyId,
    "key_id",
    "Version label of a signing key; lets old signatures verify after rotation.",
    r"^[A-Za-z0-9._-]{1,64}$"
);
newtype!(
    Nonce,
    "nonce",
    "Single-use anti-replay token.",
    r"^[A-Za-z0-9._-]{1,128}$"
);
newtype!(
    Timestamp,
    "timestamp",
    "UTC ISO-8601 timestamp with second precision and `Z` suffix.",
    r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z$"
);

impl Timestamp {
    /// Current UTC time at second precision.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Formats a UTC instant, truncating sub-second precision.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format("%Y-%m-%dT%H:%M:%SZ").to_string())
    }

    /// Parses the timestamp back into a UTC instant.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, ValidationError> {
        DateTime::parse_from_rfc3339(&self.0)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ValidationError::PatternMismatch {
                field: "timestamp",
                value: self.0.clone(),
            })
    }
}

/// Formats a ledger-entry timestamp: RFC 3339, microsecond precision, `Z` suffix.
///
/// The width is fixed so lexical order equals chronological order.
pub fn entry_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_truncates_subseconds() {
        let at = Utc.with_ymd_and_hms(2024, 7, 15, 10, 15, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        assert_eq!(Timestamp::from_datetime(at).as_str(), "2024-07-15T10:15:00Z");
    }

    #[test]
    fn timestamp_rejects_fractional_and_offsets() {
        assert!(Timestamp::parse("2024-07-15T10:15:00Z").is_ok());
        assert!(Timestamp::parse("2024-07-15T10:15:00.5Z").is_err());
        assert!(Timestamp::parse("2024-07-15T10:15:00+05:30").is_err());
    }

    #[test]
    fn empty_identifier_is_missing_field() {
        match TraceId::parse("") {
            Err(ValidationError::MissingField { field }) => assert_eq!(field, "trace_id"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn entry_timestamp_is_fixed_width() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(entry_timestamp(at), "2024-01-01T00:00:00.000000Z");
    }
}
