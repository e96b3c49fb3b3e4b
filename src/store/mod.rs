//! Secret store seam.
//!
//! This module provides:
//! - The `SecretStore` trait both engines talk to
//! - A HashiCorp-Vault compatible HTTP client (`http`)
//! - An in-memory store for tests and local experiments (`memory`)

pub mod http;
pub mod memory;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::errors::Result;

pub use http::{ClientConfig, VaultClient};
pub use memory::MemoryStore;

/// The literal data of one secret: field name -> JSON value.
pub type FieldMap = Map<String, Value>;

/// Engine type reported for the KV secrets engine.
pub const KV_ENGINE: &str = "kv";

/// Separator between path segments, also the folder marker in listings.
pub const SEPARATOR: char = '/';

/// One entry of the store's mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// Engine type, e.g. `kv`.
    pub engine_type: String,
    /// KV engine version (`1` or `2`) when the backend reports one.
    pub version: Option<String>,
}

impl MountInfo {
    pub fn kv(version: &str) -> Self {
        Self {
            engine_type: KV_ENGINE.to_string(),
            version: Some(version.to_string()),
        }
    }

    /// True for the KV engine family.
    pub fn is_kv(&self) -> bool {
        self.engine_type == KV_ENGINE
    }
}

/// Operations the capture and restore engines need from a secret store.
///
/// Paths are relative to a mount and never carry a leading separator.
/// Listings mark folders with a trailing `/`.
pub trait SecretStore {
    /// Check that the store is reachable and the credentials are valid.
    fn verify_access(&self) -> Result<()> {
        Ok(())
    }

    /// All mounted engines, keyed by mount name without the trailing `/`.
    fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>>;

    /// Child names directly under `path`.
    ///
    /// Fails with `NotFound` when `path` is not a folder.
    fn list_children(&self, mount: &str, path: &str) -> Result<Vec<String>>;

    /// Field map stored at `path`; `NotFound` when no secret exists there.
    fn read_secret(&self, mount: &str, path: &str) -> Result<FieldMap>;

    /// Replace the field map stored at `path`.
    fn write_secret(&self, mount: &str, path: &str, data: &FieldMap) -> Result<()>;
}

/// Mounts of the KV engine family only.
pub fn kv_mounts<S: SecretStore + ?Sized>(store: &S) -> Result<BTreeMap<String, MountInfo>> {
    Ok(store
        .list_mounts()?
        .into_iter()
        .filter(|(_, info)| info.is_kv())
        .collect())
}

/// Strip the trailing separator the backend appends to mount names.
pub fn normalize_mount(name: &str) -> &str {
    name.trim_end_matches(SEPARATOR)
}
