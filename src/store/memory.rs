//! In-memory secret store.
//!
//! Mirrors the listing and read/write semantics of the HTTP backend so
//! the capture and restore engines can be exercised without a server.
//! Individual operations can be made to fail to simulate a degraded
//! backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock};

use super::{FieldMap, MountInfo, SecretStore, SEPARATOR};
use crate::errors::{Result, VaultKeepError};

/// Store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    List,
    Read,
    Write,
}

/// Kind of error an injected failure produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Connectivity,
    Authorization,
    NotFound,
}

impl Failure {
    fn to_error(self, mount: &str, path: &str) -> VaultKeepError {
        let target = format!("{mount}/{path}");
        match self {
            Failure::Connectivity => VaultKeepError::Connectivity(format!("{target}: connection reset")),
            Failure::Authorization => VaultKeepError::Authorization(target),
            Failure::NotFound => VaultKeepError::NotFound(target),
        }
    }
}

type Address = (String, String);

/// A secret store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    mounts: RwLock<BTreeMap<String, MountInfo>>,
    secrets: RwLock<BTreeMap<Address, FieldMap>>,
    failures: RwLock<BTreeMap<(Operation, String, String), Failure>>,
    writes: RwLock<usize>,
}

impl MemoryStore {
    /// Create an empty store with no mounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with KV v2 mounts of the given names.
    pub fn with_kv_mounts(names: &[&str]) -> Self {
        let store = Self::new();
        for name in names {
            store.add_mount(name, MountInfo::kv("2"));
        }
        store
    }

    /// Add (or replace) a mount.
    pub fn add_mount(&self, name: &str, info: MountInfo) {
        self.mounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), info);
    }

    /// Seed a secret directly, bypassing write accounting.
    pub fn insert(&self, mount: &str, path: &str, data: FieldMap) {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((mount.to_string(), path.to_string()), data);
    }

    /// Remove a secret, returning its last field map.
    pub fn delete(&self, mount: &str, path: &str) -> Option<FieldMap> {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(mount.to_string(), path.to_string()))
    }

    /// Field map at `mount/path`, if any.
    pub fn get(&self, mount: &str, path: &str) -> Option<FieldMap> {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(mount.to_string(), path.to_string()))
            .cloned()
    }

    /// Copy of every secret, keyed by `(mount, path)`.
    pub fn contents(&self) -> BTreeMap<(String, String), FieldMap> {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful `write_secret` calls so far.
    pub fn write_count(&self) -> usize {
        *self.writes.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `op` on `mount/path` fail with `failure` from now on.
    pub fn fail_on(&self, op: Operation, mount: &str, path: &str, failure: Failure) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((op, mount.to_string(), path.to_string()), failure);
    }

    fn check(&self, op: Operation, mount: &str, path: &str) -> Result<()> {
        let failures = self.failures.read().unwrap_or_else(PoisonError::into_inner);
        match failures.get(&(op, mount.to_string(), path.to_string())) {
            Some(failure) => Err(failure.to_error(mount, path)),
            None => Ok(()),
        }
    }

    fn require_mount(&self, mount: &str) -> Result<()> {
        let mounts = self.mounts.read().unwrap_or_else(PoisonError::into_inner);
        if mounts.contains_key(mount) {
            Ok(())
        } else {
            Err(VaultKeepError::NotFound(format!("no mount named '{mount}'")))
        }
    }
}

impl SecretStore for MemoryStore {
    fn list_mounts(&self) -> Result<BTreeMap<String, MountInfo>> {
        Ok(self
            .mounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn list_children(&self, mount: &str, path: &str) -> Result<Vec<String>> {
        self.check(Operation::List, mount, path)?;
        self.require_mount(mount)?;

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{path}{SEPARATOR}")
        };

        let secrets = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
        let children: BTreeSet<String> = secrets
            .keys()
            .filter(|(m, _)| m == mount)
            .filter_map(|(_, p)| p.strip_prefix(&prefix))
            .map(|rest| match rest.split_once(SEPARATOR) {
                Some((folder, _)) => format!("{folder}{SEPARATOR}"),
                None => rest.to_string(),
            })
            .collect();

        if children.is_empty() {
            return Err(VaultKeepError::NotFound(format!("{mount}/{path} is not a folder")));
        }
        Ok(children.into_iter().collect())
    }

    fn read_secret(&self, mount: &str, path: &str) -> Result<FieldMap> {
        self.check(Operation::Read, mount, path)?;
        self.require_mount(mount)?;
        self.get(mount, path)
            .ok_or_else(|| VaultKeepError::NotFound(format!("no secret at {mount}/{path}")))
    }

    fn write_secret(&self, mount: &str, path: &str, data: &FieldMap) -> Result<()> {
        self.check(Operation::Write, mount, path)?;
        self.require_mount(mount)?;
        if path.is_empty() {
            return Err(VaultKeepError::Store {
                status: 405,
                message: format!("cannot write a secret at the root of '{mount}'"),
            });
        }
        self.insert(mount, path, data.clone());
        *self.writes.write().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
