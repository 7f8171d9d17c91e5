//! Deterministic request-context fingerprints for deduplication.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use sovereign_canonical::{sha256_hex, Canonicalizer, HexDigest};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::errors::FingerprintError;

/// Hashes normalized request context into a stable digest.
///
/// Query text is trimmed and lowercased, jurisdiction lowercased and the
/// timestamp truncated to the start of its UTC hour, so identical requests
/// within one hour window share a fingerprint.
#[derive(Clone)]
pub struct ContextFingerprint {
    canonicalizer: Canonicalizer,
    clock: Arc<dyn Clock>,
}

impl Default for ContextFingerprint {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ContextFingerprint {
    /// Creates a generator that reads "now" from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            canonicalizer: Canonicalizer::new(),
            clock,
        }
    }

    /// Computes the fingerprint of a request context.
    ///
    /// `timestamp` defaults to the current time; `user_id` is omitted from
    /// the hashed object when absent.
    pub fn generate_fingerprint(
        &self,
        query_text: &str,
        user_id: Option<&str>,
        jurisdiction: &str,
        timestamp: Option<&str>,
    ) -> Result<HexDigest, FingerprintError> {
        let at = match timestamp {
            Some(raw) => parse_timestamp(raw)?,
            None => self.clock.now(),
        };

        let mut context = Map::new();
        context.insert(
            "query_text".into(),
            Value::String(query_text.trim().to_lowercase()),
        );
        if let Some(user_id) = user_id {
            context.insert("user_id".into(), Value::String(user_id.to_string()));
        }
        context.insert(
            "jurisdiction".into(),
            Value::String(jurisdiction.to_lowercase()),
        );
        context.insert("timestamp_bucket".into(), Value::String(hour_bucket(at)));

        let bytes = self.canonicalizer.canonicalize(&Value::Object(context))?;
        Ok(sha256_hex(&bytes))
    }
}

impl std::fmt::Debug for ContextFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextFingerprint").finish_non_exhaustive()
    }
}

/// Formats the start of `at`'s UTC hour.
pub fn hour_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:00:00Z").to_string()
}

/// Accepts RFC 3339 (with `Z` or an offset) or a naive timestamp taken as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FingerprintError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| FingerprintError::InvalidTimestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn generator() -> ContextFingerprint {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 7, 15, 10, 30, 0).unwrap());
        ContextFingerprint::new(Arc::new(clock))
    }

    #[test]
    fn same_hour_and_normalized_text_match() {
        let g = generator();
        let a = g
            .generate_fingerprint("Hello World", Some("u1"), "India", Some("2024-07-15T10:15:00Z"))
            .unwrap();
        let b = g
            .generate_fingerprint("hello world", Some("u1"), "india", Some("2024-07-15T10:59:59Z"))
            .unwrap();
        let c = g
            .generate_fingerprint("Hello World", Some("u1"), "India", Some("2024-07-15T11:00:00Z"))
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn matches_hash_of_canonical_context() {
        let expected = sha256_hex(
            br#"{"jurisdiction":"india","query_text":"hello world","timestamp_bucket":"2024-07-15T10:00:00Z","user_id":"u1"}"#,
        );
        let actual = generator()
            .generate_fingerprint(" Hello World ", Some("u1"), "India", Some("2024-07-15T10:15:00Z"))
            .unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn absent_user_is_dropped_not_nulled() {
        let g = generator();
        let without = g
            .generate_fingerprint("q", None, "global", Some("2024-07-15T10:15:00Z"))
            .unwrap();
        let expected = sha256_hex(
            br#"{"jurisdiction":"global","query_text":"q","timestamp_bucket":"2024-07-15T10:00:00Z"}"#,
        );
        assert_eq!(without, expected);
    }

    #[test]
    fn missing_timestamp_uses_clock_bucket() {
        let g = generator();
        assert_eq!(
            g.generate_fingerprint("q", None, "global", None).unwrap(),
            g.generate_fingerprint("q", None, "global", Some("2024-07-15T10:00:00Z"))
                .unwrap()
        );
    }

    #[test]
    fn offsets_are_bucketed_in_utc() {
        let g = generator();
        assert_eq!(
            g.generate_fingerprint("q", None, "global", Some("2024-07-15T15:45:00+05:30"))
                .unwrap(),
            g.generate_fingerprint("q", None, "global", Some("2024-07-15T10:00:00"))
                .unwrap()
        );
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(matches!(
            generator().generate_fingerprint("q", None, "global", Some("yesterday")),
            Err(FingerprintError::InvalidTimestamp(_))
        ));
    }
}
