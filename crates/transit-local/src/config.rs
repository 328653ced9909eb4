//! Configuration loading and validation for the local transit backend.
//!
//! Values are read from `FIELDVAULT_`-prefixed environment variables. The
//! caller gets a clear error if the master key is missing or malformed.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::cipher::KEY_LEN;

/// Validated local transit configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalTransitConfig {
    /// Base64-encoded 32-byte master key (`FIELDVAULT_MASTER_KEY`).
    /// **Required.**
    pub master_key: String,
}

impl LocalTransitConfig {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `FIELDVAULT_MASTER_KEY` is absent or empty.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix("FIELDVAULT"))
            .build()
            .context("failed to build configuration from environment")?;

        let c: LocalTransitConfig = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.master_key.trim().is_empty() {
            anyhow::bail!("FIELDVAULT_MASTER_KEY is required and must not be empty");
        }
        Ok(())
    }

    /// Decode the master key into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not valid base64 or does not decode
    /// to exactly [`KEY_LEN`] bytes.
    pub fn master_key_bytes(&self) -> Result<[u8; KEY_LEN]> {
        let bytes = STANDARD
            .decode(self.master_key.trim())
            .context("FIELDVAULT_MASTER_KEY is not valid base64")?;
        let len = bytes.len();
        bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!("FIELDVAULT_MASTER_KEY must decode to exactly {KEY_LEN} bytes, got {len}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = LocalTransitConfig {
            master_key: "  ".into(),
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn master_key_bytes_round_trip() {
        let cfg = LocalTransitConfig {
            master_key: STANDARD.encode([0x11u8; KEY_LEN]),
        };
        assert_eq!(cfg.master_key_bytes().unwrap(), [0x11u8; KEY_LEN]);
    }

    #[test]
    fn master_key_bytes_rejects_bad_base64() {
        let cfg = LocalTransitConfig {
            master_key: "!!!not base64!!!".into(),
        };
        assert!(cfg.master_key_bytes().is_err());
    }

    #[test]
    fn master_key_bytes_rejects_wrong_length() {
        let cfg = LocalTransitConfig {
            master_key: STANDARD.encode([0u8; 16]),
        };
        let err = cfg.master_key_bytes().unwrap_err();
        assert!(err.to_string().contains("32"));
    }
}
