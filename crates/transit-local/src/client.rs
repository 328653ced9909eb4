//! [`LocalTransit`]: the in-process [`TransitClient`] implementation.

use common::{BatchOutcome, TransitClient, TransitError, TransitItem, TransitItemError};
use tracing::debug;

use crate::cipher::{decrypt_value, derive_key, encrypt_value, CipherError, KEY_LEN};
use crate::config::LocalTransitConfig;

/// Master key buffer holding exactly [`KEY_LEN`] bytes.
///
/// Overwritten with zeroes on drop to minimise the window during which key
/// material lives in RAM.
struct MasterKey(Box<[u8; KEY_LEN]>);

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("MasterKey([REDACTED])")
    }
}

/// Deterministic transit backend: data keys derived per `(key_path,
/// key_name)` from one master key, AES-256-GCM-SIV per value.
#[derive(Debug)]
pub struct LocalTransit {
    master: MasterKey,
}

impl LocalTransit {
    /// Backend over the given 32-byte master key.
    pub fn new(master: [u8; KEY_LEN]) -> Self {
        Self {
            master: MasterKey(Box::new(master)),
        }
    }

    /// Backend configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `FIELDVAULT_MASTER_KEY` is missing, not valid
    /// base64, or does not decode to exactly 32 bytes.
    pub fn from_env() -> anyhow::Result<Self> {
        let cfg = LocalTransitConfig::from_env()?;
        Ok(Self::new(cfg.master_key_bytes()?))
    }

    fn data_key(&self, key_path: &str, key_name: &str) -> [u8; KEY_LEN] {
        derive_key(&self.master.0, key_path, key_name)
    }
}

impl TransitClient for LocalTransit {
    fn encrypt_batch(
        &self,
        key_path: &str,
        items: &[TransitItem],
    ) -> Result<BatchOutcome, TransitError> {
        debug!(key_path, count = items.len(), "local transit encrypt batch");
        Ok(items
            .iter()
            .map(|item| {
                let key = self.data_key(key_path, &item.key_name);
                encrypt_value(item.payload.as_bytes(), &key)
                    .map_err(|e| item_error(&item.key_name, e))
            })
            .collect())
    }

    fn decrypt_batch(
        &self,
        key_path: &str,
        items: &[TransitItem],
    ) -> Result<BatchOutcome, TransitError> {
        debug!(key_path, count = items.len(), "local transit decrypt batch");
        Ok(items
            .iter()
            .map(|item| {
                let key = self.data_key(key_path, &item.key_name);
                let plaintext =
                    decrypt_value(&item.payload, &key).map_err(|e| item_error(&item.key_name, e))?;
                String::from_utf8(plaintext)
                    .map_err(|_| TransitItemError::Malformed("plaintext is not valid UTF-8".into()))
            })
            .collect())
    }
}

fn item_error(key_name: &str, e: CipherError) -> TransitItemError {
    match e {
        CipherError::InvalidFormat => {
            TransitItemError::Malformed("not a vault:v1 ciphertext".into())
        }
        CipherError::AeadFailure => TransitItemError::AuthenticationFailed {
            key_name: key_name.to_owned(),
        },
        CipherError::InvalidKeyLength => {
            TransitItemError::Malformed("derived key has invalid length".into())
        }
    }
}
