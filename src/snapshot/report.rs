//! Outcome of one capture or restore run.
//!
//! Failures local to one secret or subtree never abort a run; they are
//! collected here so the caller can show what was left out.

use std::collections::BTreeMap;

use crate::errors::VaultKeepError;

/// A secret or subtree that could not be read or written.
#[derive(Debug)]
pub struct SyncFailure {
    pub mount: String,
    pub path: String,
    pub error: VaultKeepError,
}

/// A document mount that restore did not touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMount {
    pub mount: String,
    pub reason: String,
}

/// Per-mount counters plus every contained failure.
#[derive(Debug, Default)]
pub struct SyncReport {
    secrets: BTreeMap<String, usize>,
    failures: Vec<SyncFailure>,
    skipped: Vec<SkippedMount>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mount as walked, even if it yields nothing.
    pub fn touch_mount(&mut self, mount: &str) {
        self.secrets.entry(mount.to_string()).or_insert(0);
    }

    /// Count one secret read (capture) or written (restore).
    pub fn record_secret(&mut self, mount: &str) {
        *self.secrets.entry(mount.to_string()).or_insert(0) += 1;
    }

    pub fn record_failure(&mut self, mount: &str, path: &str, error: VaultKeepError) {
        self.failures.push(SyncFailure {
            mount: mount.to_string(),
            path: path.to_string(),
            error,
        });
    }

    pub fn skip_mount(&mut self, mount: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedMount {
            mount: mount.to_string(),
            reason: reason.into(),
        });
    }

    /// Secrets handled per walked mount, in mount order.
    pub fn mounts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.secrets.iter().map(|(m, n)| (m.as_str(), *n))
    }

    pub fn secret_count(&self) -> usize {
        self.secrets.values().sum()
    }

    /// Failures recorded against `mount`.
    pub fn failure_count_for(&self, mount: &str) -> usize {
        self.failures.iter().filter(|f| f.mount == mount).count()
    }

    pub fn failures(&self) -> &[SyncFailure] {
        &self.failures
    }

    pub fn skipped(&self) -> &[SkippedMount] {
        &self.skipped
    }

    /// True when nothing failed and no mount was skipped.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}
