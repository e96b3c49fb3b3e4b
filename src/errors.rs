use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in VaultKeep.
#[derive(Debug, Error)]
pub enum VaultKeepError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong encryption key or corrupted backup")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Secret store errors ---
    #[error("Cannot reach the secret store: {0}")]
    Connectivity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    Authorization(String),

    #[error("Secret store returned HTTP {status}: {message}")]
    Store { status: u16, message: String },

    // --- Snapshot errors ---
    #[error("Backup file not found at {0}")]
    BackupNotFound(PathBuf),

    #[error("Invalid backup document: {0}")]
    InvalidDocument(String),

    #[error("Path conflict: {0}")]
    PathConflict(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl VaultKeepError {
    /// True when the store reported that the addressed folder or secret
    /// does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience type alias for VaultKeep results.
pub type Result<T> = std::result::Result<T, VaultKeepError>;
