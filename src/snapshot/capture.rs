//! Store → document traversal.
//!
//! Walks every folder under a starting path depth-first with an
//! explicit stack.  Listing decides folder vs. leaf: names ending in
//! `/` are folders, everything else is a secret to read.  When listing
//! reports `NotFound` the address is read directly as a single secret;
//! any other listing error is reported and that branch skipped, so a
//! flaky connection is never mistaken for a leaf.

use serde_json::Value;
use tracing::{debug, error, warn};

use super::document::{join_path, segments_for, Document, MAX_PATH_SEGMENTS};
use super::report::SyncReport;
use crate::errors::{Result, VaultKeepError};
use crate::store::{kv_mounts, normalize_mount, SecretStore, SEPARATOR};

/// Everything a capture run produced.
#[derive(Debug, Default)]
pub struct CaptureOutcome {
    /// Every secret that was read successfully.
    pub document: Document,
    /// Per-mount counts and the secrets left out.
    pub report: SyncReport,
}

/// Read secrets from `store` into a fresh document.
///
/// Without `mount_filter` every KV mount is walked, each starting at
/// `path_filter`.  Only enumerating the mounts can fail the whole run;
/// per-secret and per-subtree errors land in the report.
pub fn capture<S: SecretStore + ?Sized>(
    store: &S,
    mount_filter: Option<&str>,
    path_filter: Option<&str>,
) -> Result<CaptureOutcome> {
    let start = path_filter.unwrap_or_default().trim_matches(SEPARATOR);

    let mounts: Vec<String> = match mount_filter {
        Some(mount) => vec![normalize_mount(mount).to_string()],
        None => {
            debug!("enumerating KV mounts");
            kv_mounts(store)?.into_keys().collect()
        }
    };

    let mut outcome = CaptureOutcome::default();
    for mount in &mounts {
        debug!("fetching secrets from mount '{mount}', path '{start}'");
        walk_mount(store, mount, start, &mut outcome);
    }
    Ok(outcome)
}

fn walk_mount<S: SecretStore + ?Sized>(
    store: &S,
    mount: &str,
    start: &str,
    outcome: &mut CaptureOutcome,
) {
    outcome.report.touch_mount(mount);

    let mut stack = vec![start.to_string()];
    while let Some(path) = stack.pop() {
        if segments_for(&path).len() > MAX_PATH_SEGMENTS {
            error!("{mount}/{path} is more than {MAX_PATH_SEGMENTS} levels deep, skipping");
            outcome.report.record_failure(
                mount,
                &path,
                VaultKeepError::InvalidDocument(format!(
                    "deeper than {MAX_PATH_SEGMENTS} levels"
                )),
            );
            continue;
        }

        match store.list_children(mount, &path) {
            Ok(children) => {
                debug!("listing {mount}/{path}: {} entries", children.len());
                let mut folders = Vec::new();
                for child in children {
                    match child.strip_suffix(SEPARATOR) {
                        Some(folder) => {
                            debug!("{mount}/{} is a folder, going deeper", join_path(&path, folder));
                            folders.push(join_path(&path, folder));
                        }
                        None => fetch_into(store, mount, &join_path(&path, &child), outcome),
                    }
                }
                // Reverse so folders are visited in listing order.
                stack.extend(folders.into_iter().rev());
            }
            Err(e) if e.is_not_found() && path.is_empty() => {
                warn!("nothing to back up under mount '{mount}'");
            }
            Err(e) if e.is_not_found() => {
                debug!("{mount}/{path} is not a folder, reading it as a single secret");
                fetch_into(store, mount, &path, outcome);
            }
            Err(e) => {
                error!("failed to list {mount}/{path}: {e}");
                outcome.report.record_failure(mount, &path, e);
            }
        }
    }
}

fn fetch_into<S: SecretStore + ?Sized>(
    store: &S,
    mount: &str,
    path: &str,
    outcome: &mut CaptureOutcome,
) {
    let fields = match store.read_secret(mount, path) {
        Ok(fields) => fields,
        Err(e) => {
            error!("failed to fetch secret from {mount}/{path}: {e}");
            outcome.report.record_failure(mount, path, e);
            return;
        }
    };

    if fields.values().any(Value::is_object) {
        warn!("{mount}/{path} has object-valued fields and will read back as a folder on restore");
    }

    match outcome.document.insert_secret(mount, path, fields) {
        Ok(()) => {
            debug!("captured {mount}/{path}");
            outcome.report.record_secret(mount);
        }
        Err(e) => {
            error!("cannot place {mount}/{path} in the backup: {e}");
            outcome.report.record_failure(mount, path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{Failure, MemoryStore, Operation};
    use crate::store::{FieldMap, MountInfo};
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::with_kv_mounts(&["secret", "kv"]);
        store.add_mount(
            "transit",
            MountInfo {
                engine_type: "transit".into(),
                version: None,
            },
        );
        store.insert("secret", "app1", fields(json!({"foo": "bar", "api_key": "12345"})));
        store.insert("secret", "team/db", fields(json!({"user": "app"})));
        store.insert("secret", "team/deep/cache", fields(json!({"ttl": 60})));
        store.insert("kv", "other", fields(json!({"enabled": true})));
        store
    }

    #[test]
    fn captures_every_kv_mount() {
        let outcome = capture(&seeded(), None, None).unwrap();
        let expected = json!({
            "kv": {"other": {"enabled": true}},
            "secret": {
                "app1": {"foo": "bar", "api_key": "12345"},
                "team": {"db": {"user": "app"}, "deep": {"cache": {"ttl": 60}}}
            }
        });
        assert_eq!(serde_json::to_value(&outcome.document).unwrap(), expected);
        assert_eq!(outcome.report.secret_count(), 4);
        assert!(outcome.report.is_clean());
    }

    #[test]
    fn non_kv_mounts_are_ignored() {
        let outcome = capture(&seeded(), None, None).unwrap();
        assert!(outcome.document.mount("transit").is_none());
    }

    #[test]
    fn mount_filter_limits_walk() {
        let outcome = capture(&seeded(), Some("kv/"), None).unwrap();
        assert!(outcome.document.mount("secret").is_none());
        assert!(outcome.document.mount("kv").is_some());
    }

    #[test]
    fn path_filter_on_folder() {
        let outcome = capture(&seeded(), Some("secret"), Some("team")).unwrap();
        let expected = json!({
            "secret": {"team": {"db": {"user": "app"}, "deep": {"cache": {"ttl": 60}}}}
        });
        assert_eq!(serde_json::to_value(&outcome.document).unwrap(), expected);
    }

    #[test]
    fn path_filter_on_single_secret_falls_back_to_read() {
        let outcome = capture(&seeded(), Some("secret"), Some("/team/db")).unwrap();
        let expected = json!({"secret": {"team": {"db": {"user": "app"}}}});
        assert_eq!(serde_json::to_value(&outcome.document).unwrap(), expected);
    }

    #[test]
    fn one_failing_read_is_isolated() {
        let store = seeded();
        store.fail_on(Operation::Read, "secret", "team/db", Failure::Authorization);

        let outcome = capture(&store, None, None).unwrap();
        assert_eq!(outcome.report.secret_count(), 3);
        assert_eq!(outcome.report.failures().len(), 1);
        assert_eq!(outcome.report.failures()[0].path, "team/db");
        assert!(outcome.document.mount("secret").unwrap().get("app1").is_some());
    }

    #[test]
    fn listing_error_other_than_not_found_skips_branch() {
        let store = seeded();
        store.fail_on(Operation::List, "secret", "team", Failure::Connectivity);

        let outcome = capture(&store, Some("secret"), None).unwrap();
        let root = outcome.document.mount("secret").unwrap();
        assert!(root.get("team").is_none());
        assert_eq!(outcome.report.failures().len(), 1);
        assert!(matches!(
            outcome.report.failures()[0].error,
            VaultKeepError::Connectivity(_)
        ));
    }

    #[test]
    fn missing_path_is_reported_once() {
        let outcome = capture(&seeded(), Some("secret"), Some("nope")).unwrap();
        assert!(outcome.document.is_empty());
        assert_eq!(outcome.report.failures().len(), 1);
        assert!(outcome.report.failures()[0].error.is_not_found());
    }

    #[test]
    fn empty_mount_is_not_a_failure() {
        let store = MemoryStore::with_kv_mounts(&["empty"]);
        let outcome = capture(&store, None, None).unwrap();
        assert!(outcome.document.is_empty());
        assert!(outcome.report.is_clean());
        assert_eq!(outcome.report.mounts().collect::<Vec<_>>(), vec![("empty", 0)]);
    }
}
