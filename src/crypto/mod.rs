//! Encryption envelope for backup files.
//!
//! This module provides:
//! - Passphrase → 256-bit key derivation (`keys`)
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - The base64 text envelope written to disk (`envelope`)

pub mod encryption;
pub mod envelope;
pub mod keys;

pub use encryption::{decrypt, encrypt};
pub use envelope::{open, seal};
pub use keys::{derive_key, EnvelopeKey};
