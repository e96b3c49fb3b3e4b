//! Passphrase-based key derivation.
//!
//! Backups are keyed by a passphrase that must produce the same key on
//! any machine, with no salt or parameters stored next to the file.
//! The passphrase is hashed with SHA-256 onto 32 bytes, then expanded
//! once with HKDF-SHA256 under a fixed context string so the raw hash
//! is never used directly as an AES key.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::errors::{Result, VaultKeepError};

/// Length of the envelope key (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// HKDF context binding the key to the backup envelope.
const ENVELOPE_INFO: &[u8] = b"vaultkeep-envelope-v1";

/// A 32-byte envelope key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct EnvelopeKey {
    bytes: [u8; KEY_LEN],
}

impl EnvelopeKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

/// Derive the envelope key for `passphrase`.
///
/// Deterministic: the same passphrase always yields the same key.
pub fn derive_key(passphrase: &[u8]) -> Result<EnvelopeKey> {
    if passphrase.is_empty() {
        return Err(VaultKeepError::KeyDerivationFailed(
            "encryption key cannot be empty".into(),
        ));
    }

    let mut digest: [u8; KEY_LEN] = Sha256::digest(passphrase).into();
    let hk = Hkdf::<Sha256>::new(None, &digest);
    digest.zeroize();

    let mut okm = [0u8; KEY_LEN];
    hk.expand(ENVELOPE_INFO, &mut okm)
        .map_err(|e| VaultKeepError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    let key = EnvelopeKey::new(okm);
    okm.zeroize();
    Ok(key)
}
