//! Text envelope around an encrypted snapshot.
//!
//! A sealed backup is the standard base64 encoding of
//! `nonce || ciphertext || tag`, so it stays printable like the
//! plaintext JSON/YAML files it replaces.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::encryption::{decrypt, encrypt};
use super::keys::derive_key;
use crate::errors::{Result, VaultKeepError};

/// Encrypt `plaintext` under a key derived from `passphrase`.
pub fn seal(passphrase: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = derive_key(passphrase)?;
    let ciphertext = encrypt(&key, plaintext)?;
    Ok(BASE64.encode(ciphertext).into_bytes())
}

/// Reverse `seal`.
///
/// Anything that is not a valid envelope for this passphrase fails with
/// `DecryptionFailed`.
pub fn open(passphrase: &[u8], sealed: &[u8]) -> Result<Vec<u8>> {
    let key = derive_key(passphrase)?;
    let text = std::str::from_utf8(sealed).map_err(|_| VaultKeepError::DecryptionFailed)?;
    let raw = BASE64
        .decode(text.trim())
        .map_err(|_| VaultKeepError::DecryptionFailed)?;
    decrypt(&key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_output_is_ascii() {
        let sealed = seal(b"pass", b"{\"secret\":{}}").unwrap();
        assert!(sealed.iter().all(u8::is_ascii));
    }

    #[test]
    fn open_rejects_non_base64() {
        let result = open(b"pass", b"{\"plain\": \"json\"}");
        assert!(matches!(result, Err(VaultKeepError::DecryptionFailed)));
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        let mut sealed = seal(b"pass", b"data").unwrap();
        sealed.push(b'\n');
        assert_eq!(open(b"pass", &sealed).unwrap(), b"data");
    }
}
