//! Event envelopes, the event-name vocabulary and signed events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sovereign_canonical::{AgentId, Jurisdiction, KeyId, Nonce, Timestamp, TraceId, ValidationError};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Event-specific payload: unordered key/value data.
pub type Details = BTreeMap<String, Value>;

/// Fixed vocabulary of provenance event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    /// A query entered the gateway.
    QueryReceived,
    /// An agent classified the query.
    AgentClassified,
    /// The jurisdiction for the query was resolved.
    JurisdictionResolved,
    /// Reasoning behind an answer was explained.
    ReasoningExplained,
    /// An evidence chain was produced.
    EvidenceChainGenerated,
    /// A decision was explained to the caller.
    DecisionExplained,
    /// Feedback was scored by the reward engine.
    RlFeedbackReceived,
    /// The trace finished.
    TraceCompleted,
}

impl EventName {
    /// Every member of the vocabulary, in declaration order.
    pub const ALL: [EventName; 8] = [
        EventName::QueryReceived,
        EventName::AgentClassified,
        EventName::JurisdictionResolved,
        EventName::ReasoningExplained,
        EventName::EvidenceChainGenerated,
        EventName::DecisionExplained,
        EventName::RlFeedbackReceived,
        EventName::TraceCompleted,
    ];

    /// Wire name of the event.
    pub fn as_str(self) -> &'static str {
        match self {
            EventName::QueryReceived => "query_received",
            EventName::AgentClassified => "agent_classified",
            EventName::JurisdictionResolved => "jurisdiction_resolved",
            EventName::ReasoningExplained => "reasoning_explained",
            EventName::EvidenceChainGenerated => "evidence_chain_generated",
            EventName::DecisionExplained => "decision_explained",
            EventName::RlFeedbackReceived => "rl_feedback_received",
            EventName::TraceCompleted => "trace_completed",
        }
    }
}

impl FromStr for EventName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                field: "event_name",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsigned payload a caller wants recorded.
///
/// All fields are required; `details` may be empty but must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventEnvelope {
    /// Trace this event belongs to.
    pub trace_id: TraceId,
    /// Event creation time.
    pub timestamp: Timestamp,
    /// Emitting component.
    pub agent_id: AgentId,
    /// Jurisdiction context.
    pub jurisdiction: Jurisdiction,
    /// Event type.
    pub event_name: EventName,
    /// Caller-supplied correlation hash.
    pub request_hash: String,
    /// Single-use anti-replay token.
    pub nonce: Nonce,
    /// Event-specific data.
    pub details: Details,
}

const STRING_FIELDS: [&str; 7] = [
    "trace_id",
    "timestamp",
    "agent_id",
    "jurisdiction",
    "event_name",
    "request_hash",
    "nonce",
];

impl EventEnvelope {
    /// Checks every required field is present and well-formed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.trace_id.validate()?;
        self.timestamp.validate()?;
        self.agent_id.validate()?;
        self.jurisdiction.validate()?;
        if self.request_hash.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "request_hash",
            });
        }
        self.nonce.validate()
    }

    /// Builds an envelope from untyped upstream JSON.
    ///
    /// Fails with [`ValidationError::MissingField`] for an absent field,
    /// [`ValidationError::WrongType`] for a mistyped one and
    /// [`ValidationError::UnexpectedField`] for anything outside the schema.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or(ValidationError::WrongType {
            field: "envelope",
            expected: "an object",
        })?;

        if let Some(extra) = obj
            .keys()
            .find(|key| key.as_str() != "details" && !STRING_FIELDS.contains(&key.as_str()))
        {
            return Err(ValidationError::UnexpectedField {
                field: extra.clone(),
            });
        }

        let text = |field: &'static str| -> Result<String, ValidationError> {
            match obj.get(field) {
                None | Some(Value::Null) => Err(ValidationError::MissingField { field }),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(ValidationError::WrongType {
                    field,
                    expected: "a string",
                }),
            }
        };

        let details = match obj.get("details") {
            None | Some(Value::Null) => {
                return Err(ValidationError::MissingField { field: "details" })
            }
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Details>(),
            Some(_) => {
                return Err(ValidationError::WrongType {
                    field: "details",
                    expected: "an object",
                })
            }
        };

        let envelope = EventEnvelope {
            trace_id: TraceId::parse(text("trace_id")?)?,
            timestamp: Timestamp::parse(text("timestamp")?)?,
            agent_id: AgentId::parse(text("agent_id")?)?,
            jurisdiction: Jurisdiction::parse(text("jurisdiction")?)?,
            event_name: text("event_name")?.parse()?,
            request_hash: text("request_hash")?,
            nonce: Nonce::parse(text("nonce")?)?,
            details,
        };
        envelope.validate()?;
        Ok(envelope)
    }

    /// Renders the envelope as a JSON object.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("trace_id".into(), Value::String(self.trace_id.to_string()));
        map.insert("timestamp".into(), Value::String(self.timestamp.to_string()));
        map.insert("agent_id".into(), Value::String(self.agent_id.to_string()));
        map.insert(
            "jurisdiction".into(),
            Value::String(self.jurisdiction.to_string()),
        );
        map.insert(
            "event_name".into(),
            Value::String(self.event_name.as_str().to_string()),
        );
        map.insert(
            "request_hash".into(),
            Value::String(self.request_hash.clone()),
        );
        map.insert("nonce".into(), Value::String(self.nonce.to_string()));
        map.insert(
            "details".into(),
            Value::Object(self.details.clone().into_iter().collect()),
        );
        Value::Object(map)
    }
}

/// Signature algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// HMAC over SHA-256, hex-encoded.
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl SignatureAlgorithm {
    /// Wire name of the algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureAlgorithm::HmacSha256 => "HMAC-SHA256",
        }
    }
}

/// Envelope plus signature metadata. Becomes part of exactly one ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedEvent {
    /// The signed envelope.
    pub event: EventEnvelope,
    /// Lowercase hex signature over the canonical envelope.
    pub signature: String,
    /// Algorithm that produced `signature`.
    pub algorithm: SignatureAlgorithm,
    /// Version of the key that produced `signature`.
    pub key_id: KeyId,
}

impl SignedEvent {
    /// Trace of the wrapped envelope.
    pub fn trace_id(&self) -> &TraceId {
        &self.event.trace_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "trace_id": "T1",
            "timestamp": "2024-07-15T10:15:00Z",
            "agent_id": "legal_agent",
            "jurisdiction": "India",
            "event_name": "query_received",
            "request_hash": "abc123",
            "nonce": "6f1c2a6e-1111-4a4a-9999-000000000001",
            "details": {}
        })
    }

    #[test]
    fn from_value_accepts_complete_envelope() {
        let envelope = EventEnvelope::from_value(&sample()).unwrap();
        assert_eq!(envelope.event_name, EventName::QueryReceived);
        assert!(envelope.details.is_empty());
        assert_eq!(envelope.to_value(), sample());
    }

    #[test]
    fn from_value_reports_each_missing_field() {
        for field in STRING_FIELDS.iter().chain(["details"].iter()) {
            let mut value = sample();
            value.as_object_mut().unwrap().remove(*field);
            match EventEnvelope::from_value(&value) {
                Err(ValidationError::MissingField { field: missing }) => {
                    assert_eq!(missing, *field)
                }
                other => panic!("{}: unexpected {:?}", field, other),
            }
        }
    }

    #[test]
    fn from_value_rejects_wrong_types_and_extras() {
        let mut value = sample();
        value["details"] = json!([1, 2]);
        assert!(matches!(
            EventEnvelope::from_value(&value),
            Err(ValidationError::WrongType { field: "details", .. })
        ));

        let mut value = sample();
        value["trace_id"] = json!(42);
        assert!(matches!(
            EventEnvelope::from_value(&value),
            Err(ValidationError::WrongType { field: "trace_id", .. })
        ));

        let mut value = sample();
        value["extra"] = json!(true);
        assert!(matches!(
            EventEnvelope::from_value(&value),
            Err(ValidationError::UnexpectedField { .. })
        ));
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let mut value = sample();
        value["event_name"] = json!("made_up");
        assert!(matches!(
            EventEnvelope::from_value(&value),
            Err(ValidationError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn serde_form_matches_to_value() {
        let envelope = EventEnvelope::from_value(&sample()).unwrap();
        assert_eq!(serde_json::to_value(&envelope).unwrap(), envelope.to_value());
    }
}
