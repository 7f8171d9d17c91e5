use chrono::{TimeZone, Utc};
use sovereign_canonical::{
    entry_timestamp, sha256_hex, Canonicalizer, HexDigest, Jurisdiction, Timestamp, TraceId,
    ValidationError,
};
use serde_json::json;

#[test]
fn canonical_bytes_match_golden_string() {
    let value = json!({"b": [true, null], "a": 1});
    let canonical = Canonicalizer::new().canonicalize_to_string(&value).unwrap();
    assert_eq!(canonical, r#"{"a":1,"b":[true,null]}"#);
}

#[test]
fn canonical_digest_matches_golden_hash() {
    let value = json!({"b": [true, null], "a": 1});
    let bytes = Canonicalizer::new().canonicalize(&value).unwrap();
    assert_eq!(
        sha256_hex(&bytes).as_str(),
        "1cc69c7fa23616ca2ec3ee70d24390a6225c8832db8a4c814c7e0e7f942f8668"
    );
}

#[test]
fn identifier_object_hash_is_order_independent() {
    let c = Canonicalizer::new();
    let first = json!({"trace_id": "T1", "agent_id": "legal_agent"});
    let second = json!({"agent_id": "legal_agent", "trace_id": "T1"});
    let a = sha256_hex(&c.canonicalize(&first).unwrap());
    let b = sha256_hex(&c.canonicalize(&second).unwrap());
    assert_eq!(a, b);
    assert_eq!(
        a.as_str(),
        "73455c63dc0e50d42b3dbf4e8167f9fb767bdb155acd759213cf11aadb901d93"
    );
}

#[test]
fn empty_input_digest() {
    assert_eq!(
        sha256_hex(b"").as_str(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[test]
fn digest_serializes_as_bare_string() {
    let digest = HexDigest::zero();
    assert_eq!(
        serde_json::to_string(&digest).unwrap(),
        format!("\"{}\"", "0".repeat(64))
    );
    let back: HexDigest = serde_json::from_str(&serde_json::to_string(&digest).unwrap()).unwrap();
    assert_eq!(back, digest);
}

#[test]
fn timestamps_use_fixed_formats() {
    let at = Utc.with_ymd_and_hms(2024, 7, 15, 10, 5, 9).unwrap();
    assert_eq!(Timestamp::from_datetime(at).as_str(), "2024-07-15T10:05:09Z");
    assert_eq!(entry_timestamp(at), "2024-07-15T10:05:09.000000Z");
    assert_eq!(
        Timestamp::parse("2024-07-15T10:05:09Z")
            .unwrap()
            .to_datetime()
            .unwrap(),
        at
    );
}

#[test]
fn identifiers_reject_malformed_values() {
    assert_eq!(
        TraceId::parse(""),
        Err(ValidationError::MissingField { field: "trace_id" })
    );
    assert!(matches!(
        TraceId::parse("has space"),
        Err(ValidationError::PatternMismatch { field: "trace_id", .. })
    ));
    assert!(Jurisdiction::parse("India").is_ok());
    assert!(Jurisdiction::parse("9lives").is_err());
    assert!(Timestamp::parse("2024-07-15 10:05:09").is_err());
}
