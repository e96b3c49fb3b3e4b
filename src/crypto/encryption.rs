//! AES-256-GCM over a whole serialized snapshot.
//!
//! The envelope never stores a nonce separately: `encrypt` draws one
//! from the OS and emits `nonce || ciphertext || tag` as one buffer,
//! which `envelope::seal` then base64-encodes.  A buffer too short to
//! hold a nonce and a tag is rejected before the cipher runs.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use super::keys::EnvelopeKey;
use crate::errors::{Result, VaultKeepError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Seal a serialized snapshot under the passphrase-derived `key`.
pub fn encrypt(key: &EnvelopeKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| VaultKeepError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| VaultKeepError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Recover the serialized snapshot from an `encrypt` buffer.
///
/// A wrong key, a flipped bit or a truncated buffer all surface as
/// `DecryptionFailed`; the auth tag is the only integrity check.
pub fn decrypt(key: &EnvelopeKey, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultKeepError::DecryptionFailed);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| VaultKeepError::DecryptionFailed)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultKeepError::DecryptionFailed)
}
