use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{Result, VaultKeepError};
use crate::snapshot::SnapshotFormat;

/// Project-level configuration, loaded from `.vaultkeep.toml`.
///
/// Every field has a sensible default so VaultKeep works out-of-the-box
/// without any config file at all.  Command-line flags win over these.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address of the secret store.
    #[serde(default = "default_address")]
    pub address: String,

    /// Enterprise namespace, if any.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Backup serialization (`json` or `yaml`).
    #[serde(default)]
    pub format: SnapshotFormat,

    /// Backup file name without extension.
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_address() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_filename() -> String {
    "vault_backup".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: default_address(),
            namespace: None,
            format: SnapshotFormat::default(),
            filename: default_filename(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".vaultkeep.toml";

    /// Load settings from `<project_dir>/.vaultkeep.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultKeepError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.timeout_secs == 0 {
            return Err(VaultKeepError::ConfigError(
                "timeout_secs must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Per-request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
