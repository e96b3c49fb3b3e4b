//! Backup file encoding.
//!
//! A backup file is the document serialized as JSON or YAML,
//! optionally sealed with the encryption envelope.  Nothing in the file
//! says which format or whether it is encrypted: the caller supplies
//! both, the same way on backup and restore.
//!
//! File name: `<filename>.<format extension>`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use super::document::Document;
use crate::crypto::envelope;
use crate::errors::{Result, VaultKeepError};

/// Serialization used for the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    #[serde(alias = "yml")]
    Yaml,
}

impl SnapshotFormat {
    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Json => "json",
            SnapshotFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SnapshotFormat {
    type Err = VaultKeepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(SnapshotFormat::Json),
            "yaml" | "yml" => Ok(SnapshotFormat::Yaml),
            other => Err(VaultKeepError::ConfigError(format!(
                "unknown backup format '{other}' — use 'json' or 'yaml'"
            ))),
        }
    }
}

/// Serialize `document`, sealing it when a passphrase is given.
pub fn encode(
    document: &Document,
    format: SnapshotFormat,
    passphrase: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let plain = match format {
        SnapshotFormat::Json => serde_json::to_vec_pretty(document)
            .map_err(|e| VaultKeepError::SerializationError(format!("JSON: {e}")))?,
        SnapshotFormat::Yaml => serde_yaml::to_string(document)
            .map_err(|e| VaultKeepError::SerializationError(format!("YAML: {e}")))?
            .into_bytes(),
    };

    match passphrase {
        Some(pass) => envelope::seal(pass, &plain),
        None => Ok(plain),
    }
}

/// Reverse `encode`.
///
/// A wrong passphrase fails with `DecryptionFailed`.  A plaintext
/// decode failure mentions the encryption key, since the usual cause is
/// an encrypted file read without one.
pub fn decode(bytes: &[u8], format: SnapshotFormat, passphrase: Option<&[u8]>) -> Result<Document> {
    match passphrase {
        Some(pass) => {
            let plain = envelope::open(pass, bytes)?;
            parse(&plain, format)
        }
        None => parse(bytes, format).map_err(|e| match e {
            VaultKeepError::SerializationError(reason) => VaultKeepError::SerializationError(
                format!(
                    "{reason}. If the backup file is encrypted, provide the key using --encryption-key"
                ),
            ),
            other => other,
        }),
    }
}

fn parse(bytes: &[u8], format: SnapshotFormat) -> Result<Document> {
    match format {
        SnapshotFormat::Json => serde_json::from_slice(bytes).map_err(|e| {
            VaultKeepError::SerializationError(format!("failed to parse JSON backup: {e}"))
        }),
        SnapshotFormat::Yaml => serde_yaml::from_slice(bytes).map_err(|e| {
            VaultKeepError::SerializationError(format!("failed to parse YAML backup: {e}"))
        }),
    }
}

/// `<filename>.<ext>` for the chosen format.
pub fn backup_path(filename: &str, format: SnapshotFormat) -> PathBuf {
    PathBuf::from(format!("{filename}.{}", format.extension()))
}

/// Write backup bytes to disk **atomically**.
///
/// The data goes to a temp file in the same directory which is then
/// renamed over `path`, so a crash never leaves a half-written backup.
/// On Unix the file is readable by its owner only.
pub fn write_backup(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read a backup file's raw bytes.
pub fn read_backup(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        return Err(VaultKeepError::BackupNotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}
