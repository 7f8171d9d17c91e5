//! Deployment configuration: TOML file plus environment overrides.

use serde::{Deserialize, Serialize};
use sovereign_canonical::KeyId;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::signer::{KeyRing, SigningKey};

/// Overrides the nonce TTL in seconds.
pub const ENV_NONCE_TTL: &str = "NONCE_TTL_SECONDS";
/// Overrides the ledger file path.
pub const ENV_LEDGER_PATH: &str = "SOVEREIGN_LEDGER_PATH";
/// Supplies the active signing key (hex).
pub const ENV_SIGNING_KEY: &str = "SOVEREIGN_SIGNING_KEY";
/// Supplies the active signing key id.
pub const ENV_SIGNING_KEY_ID: &str = "SOVEREIGN_SIGNING_KEY_ID";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvenanceConfig {
    /// Ledger storage settings.
    pub ledger: LedgerConfig,
    /// Nonce registry settings.
    pub nonce: NonceConfig,
    /// Signing key material.
    pub signing: SigningConfig,
}

/// `[ledger]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Journal file backing the ledger.
    pub path: PathBuf,
    /// fsync after every append.
    pub sync: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("provenance_ledger.spl"),
            sync: true,
        }
    }
}

/// `[nonce]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NonceConfig {
    /// Token lifetime in seconds.
    pub ttl_secs: u64,
    /// Seconds between reaper sweeps.
    pub reap_interval_secs: u64,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            reap_interval_secs: 60,
        }
    }
}

impl NonceConfig {
    /// TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Reaper interval as a duration.
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

/// A key kept only to verify signatures made before a rotation.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetiredKey {
    /// Key version.
    pub key_id: String,
    /// Hex-encoded secret.
    pub key_hex: String,
}

impl fmt::Debug for RetiredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetiredKey")
            .field("key_id", &self.key_id)
            .field("key_hex", &"<redacted>")
            .finish()
    }
}

/// `[signing]` table.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SigningConfig {
    /// Version label of the active key.
    pub key_id: String,
    /// Hex-encoded active secret; usually supplied via the environment.
    pub key_hex: Option<String>,
    /// Older keys kept for verification.
    pub retired: Vec<RetiredKey>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key_id: "v1".into(),
            key_hex: None,
            retired: Vec::new(),
        }
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("key_id", &self.key_id)
            .field("key_hex", &self.key_hex.as_ref().map(|_| "<redacted>"))
            .field("retired", &self.retired)
            .finish()
    }
}

impl ProvenanceConfig {
    /// Loads `path` (if any), then applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML file without consulting the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_NONCE_TTL) {
            self.nonce.ttl_secs = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnv {
                    var: ENV_NONCE_TTL,
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(path) = lookup(ENV_LEDGER_PATH) {
            self.ledger.path = PathBuf::from(path);
        }
        if let Some(key) = lookup(ENV_SIGNING_KEY) {
            self.signing.key_hex = Some(key);
        }
        if let Some(key_id) = lookup(ENV_SIGNING_KEY_ID) {
            self.signing.key_id = key_id;
        }
        Ok(())
    }

    /// Rejects values no deployment can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nonce.ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "nonce.ttl_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.nonce.reap_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "nonce.reap_interval_secs",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Builds the signing key ring from the configured material.
    pub fn key_ring(&self) -> Result<KeyRing, ConfigError> {
        let secret = self
            .signing
            .key_hex
            .as_deref()
            .ok_or(ConfigError::MissingSigningKey)?;
        let active = SigningKey::from_hex(KeyId::new(self.signing.key_id.clone()), secret)?;
        let mut ring = KeyRing::new(active);
        for retired in &self.signing.retired {
            ring = ring.with_retired(SigningKey::from_hex(
                KeyId::new(retired.key_id.clone()),
                &retired.key_hex,
            )?);
        }
        Ok(ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    #[test]
    fn defaults_match_documented_values() {
        let config = ProvenanceConfig::default();
        assert_eq!(config.nonce.ttl(), Duration::from_secs(600));
        assert_eq!(config.nonce.reap_interval(), Duration::from_secs(60));
        assert!(config.ledger.sync);
        assert!(matches!(
            config.key_ring(),
            Err(ConfigError::MissingSigningKey)
        ));
    }

    #[test]
    fn parses_toml_with_retired_keys() {
        let raw = format!(
            r#"
            [ledger]
            path = "/var/lib/sovereign/ledger.spl"
            sync = false

            [nonce]
            ttl_secs = 120

            [signing]
            key_id = "v2"
            key_hex = "{KEY}"
            retired = [{{ key_id = "v1", key_hex = "{KEY}" }}]
            "#
        );
        let config: ProvenanceConfig = toml::from_str(&raw).unwrap();
        assert_eq!(config.nonce.ttl_secs, 120);
        assert_eq!(config.nonce.reap_interval_secs, 60);
        assert!(!config.ledger.sync);
        let ring = config.key_ring().unwrap();
        assert_eq!(ring.active_id().as_str(), "v2");
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_NONCE_TTL, "30"),
            (ENV_SIGNING_KEY, KEY),
            (ENV_SIGNING_KEY_ID, "rotated"),
        ]
        .into_iter()
        .collect();
        let mut config = ProvenanceConfig::default();
        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.nonce.ttl_secs, 30);
        assert_eq!(config.key_ring().unwrap().active_id().as_str(), "rotated");
    }

    #[test]
    fn bad_ttl_override_is_reported() {
        let mut config = ProvenanceConfig::default();
        let err = config
            .apply_overrides(|name| (name == ENV_NONCE_TTL).then(|| "ten".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: ENV_NONCE_TTL, .. }));
    }

    #[test]
    fn zero_ttl_is_invalid() {
        let mut config = ProvenanceConfig::default();
        config.nonce.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = ProvenanceConfig::default();
        config.signing.key_hex = Some(KEY.into());
        assert!(!format!("{:?}", config).contains(KEY));
    }
}
