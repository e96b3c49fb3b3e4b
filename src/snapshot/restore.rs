//! Document → store traversal.
//!
//! The inverse of capture.  Each node was classified once at decode
//! time, so the walk only matches on the variant:
//!
//! - `Folder`   → descend into `path/key`
//! - `FieldMap` → one write at `path/key`
//! - `Scalar`   → collected; all scalars of a node become a single
//!   secret at the node's own path
//!
//! Writes replace a secret's whole field map, so writing each scalar
//! separately would leave only the last one.  Merging them first keeps
//! every field.

use tracing::{debug, error, info, warn};

use super::document::{join_path, Document, Node, NodeValue};
use super::report::SyncReport;
use crate::errors::{Result, VaultKeepError};
use crate::store::{kv_mounts, normalize_mount, FieldMap, SecretStore};

/// Knobs for a restore run.
#[derive(Debug, Clone, Default)]
pub struct RestoreOptions {
    /// Only restore this mount; others in the document are skipped.
    pub mount_filter: Option<String>,
    /// Walk and report without writing anything.
    pub dry_run: bool,
}

/// Replay `document` into `store`.
///
/// Mounts are never created: a document mount that the live store
/// lacks is skipped with a warning.  Only enumerating the live mounts
/// can fail the whole run.
pub fn restore<S: SecretStore + ?Sized>(
    store: &S,
    document: &Document,
    options: &RestoreOptions,
) -> Result<SyncReport> {
    info!("Starting secrets restore");
    let existing = kv_mounts(store)?;
    debug!(
        "found KV mounts: {:?}",
        existing.keys().collect::<Vec<_>>()
    );

    let filter = options.mount_filter.as_deref().map(normalize_mount);
    let mut report = SyncReport::new();

    for (mount, root) in document.mounts() {
        if let Some(wanted) = filter {
            if wanted != mount.as_str() {
                warn!("Skipping restore for '{mount}' as it does not match the specified mount point '{wanted}'");
                report.skip_mount(mount, format!("does not match --mount-point '{wanted}'"));
                continue;
            }
        }

        if !existing.contains_key(mount) {
            warn!("Mount point '{mount}' does not exist in the target store, skipping");
            report.skip_mount(mount, "mount does not exist in the target store");
            continue;
        }

        restore_mount(store, mount, root, options.dry_run, &mut report);
    }

    Ok(report)
}

fn restore_mount<S: SecretStore + ?Sized>(
    store: &S,
    mount: &str,
    root: &Node,
    dry_run: bool,
    report: &mut SyncReport,
) {
    report.touch_mount(mount);

    let mut stack: Vec<(String, &Node)> = vec![(String::new(), root)];
    while let Some((path, node)) = stack.pop() {
        let mut loose = FieldMap::new();
        let mut folders = Vec::new();

        for (key, value) in node.iter() {
            match value {
                NodeValue::Folder(child) => folders.push((join_path(&path, key), child)),
                NodeValue::FieldMap(fields) => {
                    write_one(store, mount, &join_path(&path, key), fields, dry_run, report)
                }
                NodeValue::Scalar(value) => {
                    loose.insert(key.clone(), value.clone());
                }
            }
        }

        if !loose.is_empty() {
            if loose.len() > 1 {
                warn!(
                    "{mount}/{path}: merging {} loose fields into one secret",
                    loose.len()
                );
            }
            write_one(store, mount, &path, &loose, dry_run, report);
        }

        stack.extend(folders.into_iter().rev());
    }
}

fn write_one<S: SecretStore + ?Sized>(
    store: &S,
    mount: &str,
    path: &str,
    fields: &FieldMap,
    dry_run: bool,
    report: &mut SyncReport,
) {
    if path.is_empty() {
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        error!("cannot restore fields {keys:?} at the root of mount '{mount}'");
        report.record_failure(
            mount,
            path,
            VaultKeepError::InvalidDocument(format!(
                "fields {keys:?} sit directly under mount '{mount}'"
            )),
        );
        return;
    }

    if dry_run {
        info!("Would restore secret at {mount}/{path}");
        report.record_secret(mount);
        return;
    }

    match store.write_secret(mount, path, fields) {
        Ok(()) => {
            info!("Restored secret at {mount}/{path}");
            report.record_secret(mount);
        }
        Err(e) => {
            error!("Failed to restore secret at {mount}/{path}: {e}");
            report.record_failure(mount, path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{Failure, MemoryStore, Operation};
    use serde_json::{json, Value};

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn all_scalar_mapping_is_one_secret() {
        let store = MemoryStore::with_kv_mounts(&["secret"]);
        let report = restore(
            &store,
            &doc(json!({"secret": {"a": {"x": 1, "y": 2}}})),
            &RestoreOptions::default(),
        )
        .unwrap();

        assert_eq!(store.get("secret", "a").unwrap(), fields(json!({"x": 1, "y": 2})));
        assert_eq!(report.secret_count(), 1);
    }

    #[test]
    fn nested_mapping_descends() {
        let store = MemoryStore::with_kv_mounts(&["secret"]);
        restore(
            &store,
            &doc(json!({"secret": {"a": {"b": {"x": 1}}}})),
            &RestoreOptions::default(),
        )
        .unwrap();

        assert_eq!(store.get("secret", "a/b").unwrap(), fields(json!({"x": 1})));
        assert!(store.get("secret", "a").is_none());
    }

    #[test]
    fn loose_scalars_are_merged_into_one_write() {
        let store = MemoryStore::with_kv_mounts(&["secret"]);
        let document = doc(json!({
            "secret": {"app": {"a": 1, "b": "two", "nested": {"c": {"x": 1}}}}
        }));
        restore(&store, &document, &RestoreOptions::default()).unwrap();

        assert_eq!(store.get("secret", "app").unwrap(), fields(json!({"a": 1, "b": "two"})));
        assert_eq!(store.get("secret", "app/nested/c").unwrap(), fields(json!({"x": 1})));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn scalars_at_mount_root_are_reported() {
        let store = MemoryStore::with_kv_mounts(&["secret"]);
        let report = restore(
            &store,
            &doc(json!({"secret": {"loose": "value", "ok": {"k": "v"}}})),
            &RestoreOptions::default(),
        )
        .unwrap();

        assert_eq!(report.secret_count(), 1);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn missing_mount_is_skipped_without_error() {
        let store = MemoryStore::with_kv_mounts(&["secret"]);
        let report = restore(
            &store,
            &doc(json!({"secret2": {"app": {"k": "v"}}, "secret": {"app": {"k": "v"}}})),
            &RestoreOptions::default(),
        )
        .unwrap();

        assert_eq!(report.skipped().len(), 1);
        assert_eq!(report.skipped()[0].mount, "secret2");
        assert!(store.get("secret", "app").is_some());
    }

    #[test]
    fn mount_filter_skips_other_mounts() {
        let store = MemoryStore::with_kv_mounts(&["secret", "kv"]);
        let options = RestoreOptions {
            mount_filter: Some("kv/".into()),
            dry_run: false,
        };
        let report = restore(
            &store,
            &doc(json!({"secret": {"a": {"k": 1}}, "kv": {"b": {"k": 2}}})),
            &options,
        )
        .unwrap();

        assert!(store.get("secret", "a").is_none());
        assert!(store.get("kv", "b").is_some());
        assert_eq!(report.skipped()[0].mount, "secret");
    }

    #[test]
    fn failed_write_does_not_stop_the_walk() {
        let store = MemoryStore::with_kv_mounts(&["secret"]);
        store.fail_on(Operation::Write, "secret", "a", Failure::Authorization);
        let report = restore(
            &store,
            &doc(json!({"secret": {"a": {"k": 1}, "b": {"k": 2}, "c": {"d": {"k": 3}}}})),
            &RestoreOptions::default(),
        )
        .unwrap();

        assert_eq!(report.failures().len(), 1);
        assert!(store.get("secret", "b").is_some());
        assert!(store.get("secret", "c/d").is_some());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let store = MemoryStore::with_kv_mounts(&["secret"]);
        let options = RestoreOptions {
            mount_filter: None,
            dry_run: true,
        };
        let report = restore(&store, &doc(json!({"secret": {"a": {"k": 1}}})), &options).unwrap();

        assert_eq!(report.secret_count(), 1);
        assert_eq!(store.write_count(), 0);
        assert!(store.get("secret", "a").is_none());
    }
}
