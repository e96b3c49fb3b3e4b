//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, VaultKeepError};
use crate::snapshot::format::backup_path;
use crate::snapshot::SnapshotFormat;
use crate::store::{ClientConfig, SecretStore, VaultClient};

/// VaultKeep CLI: backup and restore for KV secret stores.
#[derive(Parser)]
#[command(
    name = "vaultkeep",
    about = "Backup and restore a Vault KV secret store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Secret store address (default: http://127.0.0.1:8200)
    #[arg(long, env = "VAULT_ADDR", global = true)]
    pub address: Option<String>,

    /// Secret store token
    #[arg(long, env = "VAULT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Enterprise namespace
    #[arg(long, env = "VAULT_NAMESPACE", global = true)]
    pub namespace: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Back up secrets to a file
    Backup {
        /// Mount point to back up (default: every KV mount)
        #[arg(long)]
        mount_point: Option<String>,

        /// Folder or secret path to start from
        #[arg(long, requires = "mount_point")]
        path: Option<String>,

        #[command(flatten)]
        file: FileArgs,
    },

    /// Restore secrets from a backup file
    Restore {
        /// Only restore this mount point
        #[arg(long)]
        mount_point: Option<String>,

        /// Show what would be restored without writing anything
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        file: FileArgs,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Backup file options shared by `backup` and `restore`.
#[derive(clap::Args)]
pub struct FileArgs {
    /// Backup file format: json (default) or yaml
    #[arg(short, long)]
    pub format: Option<String>,

    /// Backup file name without extension (default: vault_backup)
    #[arg(long)]
    pub filename: Option<String>,

    /// Passphrase for the encrypted backup file
    #[arg(long, env = "VAULTKEEP_ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: Option<String>,

    /// Prompt for the encryption passphrase
    #[arg(long)]
    pub encrypt: bool,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Install the stderr log subscriber.
///
/// `--debug` forces debug level; otherwise `RUST_LOG` is honoured and
/// falls back to `info`.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load `.vaultkeep.toml` from the working directory.
pub fn load_settings() -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    Settings::load(&cwd)
}

/// Backup format from `--format`, falling back to the config file.
pub fn resolve_format(file: &FileArgs, settings: &Settings) -> Result<SnapshotFormat> {
    match &file.format {
        Some(name) => name.parse(),
        None => Ok(settings.format),
    }
}

/// Full backup file path: `<filename>.<ext>`.
pub fn resolve_backup_path(
    file: &FileArgs,
    settings: &Settings,
    format: SnapshotFormat,
) -> PathBuf {
    let filename = file.filename.as_deref().unwrap_or(&settings.filename);
    backup_path(filename, format)
}

/// Get the encryption passphrase, trying in order:
/// 1. `--encryption-key` / `VAULTKEEP_ENCRYPTION_KEY`
/// 2. Interactive prompt, when `--encrypt` is set
///
/// Returns `None` for plaintext backups.  With `confirm` the prompt
/// asks for the key twice.
pub fn encryption_key(file: &FileArgs, confirm: bool) -> Result<Option<Zeroizing<String>>> {
    if let Some(key) = &file.encryption_key {
        if !key.is_empty() {
            return Ok(Some(Zeroizing::new(key.clone())));
        }
    }

    if !file.encrypt {
        return Ok(None);
    }

    let mut prompt = dialoguer::Password::new().with_prompt("Backup encryption key");
    if confirm {
        prompt = prompt.with_confirmation("Confirm encryption key", "Keys do not match, try again");
    }
    let key = prompt.interact().map_err(|e| match e {
        dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted => {
            VaultKeepError::UserCancelled
        }
        other => VaultKeepError::CommandFailed(format!("encryption key prompt: {other}")),
    })?;

    if key.is_empty() {
        return Err(VaultKeepError::CommandFailed(
            "encryption key cannot be empty".into(),
        ));
    }
    Ok(Some(Zeroizing::new(key)))
}

/// Build a client from flags and config, and check that the store
/// accepts the token.  Any failure here ends the run.
pub fn connect(cli: &Cli, settings: &Settings) -> Result<VaultClient> {
    let address = cli
        .address
        .clone()
        .unwrap_or_else(|| settings.address.clone());
    let token = cli.token.clone().ok_or_else(|| {
        VaultKeepError::ConfigError("a token is required — use --token or VAULT_TOKEN".into())
    })?;

    let client = VaultClient::new(ClientConfig {
        address,
        token,
        namespace: cli.namespace.clone().or_else(|| settings.namespace.clone()),
        timeout: settings.timeout(),
    })?;

    client.verify_access().map_err(|e| match e {
        VaultKeepError::Connectivity(reason) => VaultKeepError::Connectivity(format!(
            "failed to connect to {}: {reason}",
            client.address()
        )),
        VaultKeepError::Authorization(_) => VaultKeepError::Authorization(format!(
            "failed to authenticate to {}",
            client.address()
        )),
        other => other,
    })?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_args() -> FileArgs {
        FileArgs {
            format: None,
            filename: None,
            encryption_key: None,
            encrypt: false,
        }
    }

    #[test]
    fn format_flag_overrides_config() {
        let settings = Settings {
            format: SnapshotFormat::Yaml,
            ..Settings::default()
        };
        assert_eq!(resolve_format(&file_args(), &settings).unwrap(), SnapshotFormat::Yaml);

        let args = FileArgs {
            format: Some("json".into()),
            ..file_args()
        };
        assert_eq!(resolve_format(&args, &settings).unwrap(), SnapshotFormat::Json);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let args = FileArgs {
            format: Some("xml".into()),
            ..file_args()
        };
        assert!(resolve_format(&args, &Settings::default()).is_err());
    }

    #[test]
    fn backup_path_uses_filename_flag() {
        let args = FileArgs {
            filename: Some("out/nightly".into()),
            ..file_args()
        };
        let path = resolve_backup_path(&args, &Settings::default(), SnapshotFormat::Json);
        assert_eq!(path, PathBuf::from("out/nightly.json"));

        let path = resolve_backup_path(&file_args(), &Settings::default(), SnapshotFormat::Yaml);
        assert_eq!(path, PathBuf::from("vault_backup.yaml"));
    }

    #[test]
    fn no_key_means_plaintext() {
        assert!(encryption_key(&file_args(), true).unwrap().is_none());

        let args = FileArgs {
            encryption_key: Some("mysecretkey".into()),
            ..file_args()
        };
        let key = encryption_key(&args, true).unwrap().unwrap();
        assert_eq!(key.as_str(), "mysecretkey");
    }
}
