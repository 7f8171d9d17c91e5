//! Deterministic event signing with versioned HMAC keys.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use sovereign_canonical::{Canonicalizer, KeyId};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::SigningError;
use crate::events::{EventEnvelope, SignatureAlgorithm, SignedEvent};

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted secret length in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Secret key material tagged with its version.
#[derive(Clone)]
pub struct SigningKey {
    id: KeyId,
    secret: Vec<u8>,
}

impl SigningKey {
    /// Wraps raw secret bytes.
    pub fn new(id: KeyId, secret: Vec<u8>) -> Result<Self, SigningError> {
        id.validate()?;
        if secret.len() < MIN_KEY_LEN {
            return Err(SigningError::WeakKey {
                key_id: id.to_string(),
                len: secret.len(),
            });
        }
        Ok(Self { id, secret })
    }

    /// Decodes a hex-encoded secret.
    pub fn from_hex(id: KeyId, secret_hex: &str) -> Result<Self, SigningError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|e| SigningError::KeyEncoding {
            key_id: id.to_string(),
            reason: e.to_string(),
        })?;
        Self::new(id, secret)
    }

    /// Version label of this key.
    pub fn id(&self) -> &KeyId {
        &self.id
    }

    fn mac(&self) -> Result<HmacSha256, SigningError> {
        <HmacSha256 as Mac>::new_from_slice(&self.secret).map_err(|e| SigningError::KeyEncoding {
            key_id: self.id.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Active signing key plus retired keys kept for verification.
#[derive(Debug, Clone)]
pub struct KeyRing {
    active: KeyId,
    keys: BTreeMap<KeyId, SigningKey>,
}

impl KeyRing {
    /// Creates a ring whose only key is `active`.
    pub fn new(active: SigningKey) -> Self {
        let id = active.id.clone();
        let mut keys = BTreeMap::new();
        keys.insert(id.clone(), active);
        Self { active: id, keys }
    }

    /// Adds a retired key that still verifies old signatures.
    pub fn with_retired(mut self, key: SigningKey) -> Self {
        if key.id != self.active {
            self.keys.insert(key.id.clone(), key);
        }
        self
    }

    /// Makes `key` active; the previous active key stays in the ring.
    pub fn rotate(&mut self, key: SigningKey) {
        self.active = key.id.clone();
        self.keys.insert(key.id.clone(), key);
    }

    /// Identifier of the active key.
    pub fn active_id(&self) -> &KeyId {
        &self.active
    }

    fn active_key(&self) -> &SigningKey {
        // `active` is always inserted alongside its key
        &self.keys[&self.active]
    }

    fn get(&self, id: &KeyId) -> Option<&SigningKey> {
        self.keys.get(id)
    }
}

/// Canonicalizes event envelopes and signs them.
///
/// Signing is pure: identical input and key always yield the identical
/// signature, and nothing is recorded anywhere.
#[derive(Debug, Clone)]
pub struct EventSigner {
    keys: KeyRing,
    canonicalizer: Canonicalizer,
}

impl EventSigner {
    /// Creates a signer over `keys`.
    pub fn new(keys: KeyRing) -> Self {
        Self {
            keys,
            canonicalizer: Canonicalizer::new(),
        }
    }

    /// Algorithm used for every signature.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::HmacSha256
    }

    /// Key ring backing this signer.
    pub fn keys(&self) -> &KeyRing {
        &self.keys
    }

    /// Mutable access for key rotation.
    pub fn keys_mut(&mut self) -> &mut KeyRing {
        &mut self.keys
    }

    /// Signs `envelope` with the active key.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::Validation`] when a required field is missing
    /// or malformed; nothing is signed in that case.
    pub fn sign_event(&self, envelope: EventEnvelope) -> Result<SignedEvent, SigningError> {
        envelope.validate()?;
        let key = self.keys.active_key();
        let signature = self.compute(key, &envelope)?;
        tracing::debug!(
            trace_id = %envelope.trace_id,
            event_name = %envelope.event_name,
            key_id = %key.id,
            "signed event"
        );
        Ok(SignedEvent {
            event: envelope,
            signature,
            algorithm: self.algorithm(),
            key_id: key.id.clone(),
        })
    }

    /// Parses untyped upstream JSON into an envelope and signs it.
    pub fn sign_value(&self, envelope: &Value) -> Result<SignedEvent, SigningError> {
        let envelope = EventEnvelope::from_value(envelope)?;
        self.sign_event(envelope)
    }

    /// Checks `signed` against the key named by its `key_id`.
    ///
    /// Returns `Ok(false)` on a mismatch and an error when the key is unknown.
    pub fn verify_signature(&self, signed: &SignedEvent) -> Result<bool, SigningError> {
        let key = self
            .keys
            .get(&signed.key_id)
            .ok_or_else(|| SigningError::UnknownKey(signed.key_id.to_string()))?;
        let Ok(claimed) = hex::decode(&signed.signature) else {
            return Ok(false);
        };
        let bytes = self.canonicalizer.canonicalize_serializable(&signed.event)?;
        let mut mac = key.mac()?;
        mac.update(&bytes);
        Ok(mac.verify_slice(&claimed).is_ok())
    }

    fn compute(&self, key: &SigningKey, envelope: &EventEnvelope) -> Result<String, SigningError> {
        let bytes = self.canonicalizer.canonicalize_serializable(envelope)?;
        let mut mac = key.mac()?;
        mac.update(&bytes);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventName;
    use serde_json::json;
    use sovereign_canonical::{AgentId, Jurisdiction, Nonce, Timestamp, TraceId};

    fn key(id: &str, fill: u8) -> SigningKey {
        SigningKey::new(KeyId::new(id), vec![fill; 32]).unwrap()
    }

    fn envelope() -> EventEnvelope {
        EventEnvelope {
            trace_id: TraceId::new("T1"),
            timestamp: Timestamp::new("2024-07-15T10:15:00Z"),
            agent_id: AgentId::new("legal_agent"),
            jurisdiction: Jurisdiction::new("India"),
            event_name: EventName::QueryReceived,
            request_hash: "req-1".into(),
            nonce: Nonce::new("n-1"),
            details: [("score".to_string(), json!(0.75))].into_iter().collect(),
        }
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = EventSigner::new(KeyRing::new(key("k1", 7)));
        let a = signer.sign_event(envelope()).unwrap();
        let b = signer.sign_event(envelope()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.signature.len(), 64);
        assert_eq!(a.key_id.as_str(), "k1");
        assert!(signer.verify_signature(&a).unwrap());
    }

    #[test]
    fn different_keys_give_different_signatures() {
        let a = EventSigner::new(KeyRing::new(key("k1", 7)))
            .sign_event(envelope())
            .unwrap();
        let b = EventSigner::new(KeyRing::new(key("k1", 8)))
            .sign_event(envelope())
            .unwrap();
        assert_ne!(a.signature, b.signature);
    }

    #[test]
    fn tampered_event_fails_verification() {
        let signer = EventSigner::new(KeyRing::new(key("k1", 7)));
        let mut signed = signer.sign_event(envelope()).unwrap();
        signed.event.jurisdiction = Jurisdiction::new("UAE");
        assert!(!signer.verify_signature(&signed).unwrap());
    }

    #[test]
    fn rotated_keys_still_verify_old_signatures() {
        let mut signer = EventSigner::new(KeyRing::new(key("k1", 7)));
        let old = signer.sign_event(envelope()).unwrap();
        signer.keys_mut().rotate(key("k2", 9));
        let new = signer.sign_event(envelope()).unwrap();
        assert_eq!(new.key_id.as_str(), "k2");
        assert!(signer.verify_signature(&old).unwrap());
        assert!(signer.verify_signature(&new).unwrap());

        let fresh = EventSigner::new(KeyRing::new(key("k3", 1)));
        assert!(matches!(
            fresh.verify_signature(&old),
            Err(SigningError::UnknownKey(_))
        ));
    }

    #[test]
    fn missing_field_is_rejected_before_signing() {
        let signer = EventSigner::new(KeyRing::new(key("k1", 7)));
        let mut e = envelope();
        e.request_hash = String::new();
        assert!(matches!(
            signer.sign_event(e),
            Err(SigningError::Validation(_))
        ));

        let value = json!({"trace_id": "T1"});
        assert!(matches!(
            signer.sign_value(&value),
            Err(SigningError::Validation(_))
        ));
    }

    #[test]
    fn short_keys_are_refused() {
        assert!(matches!(
            SigningKey::new(KeyId::new("k1"), vec![1; 8]),
            Err(SigningError::WeakKey { .. })
        ));
    }
}
