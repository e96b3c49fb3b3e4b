//! The snapshot document and the rule that reads it.
//!
//! A document maps mount names to nested nodes:
//!
//! ```text
//! { "secret": { "team": { "db": { "user": "app", "password": "…" } } } }
//! ```
//!
//! The store's listings do not say whether a name is a folder or a
//! secret once it has been written out, so the document carries no type
//! tags.  Both directions instead agree on one structural rule: a
//! mapping is a secret's field map iff none of its direct values are
//! mappings.  `NodeValue::classify` applies that rule exactly once per
//! node at decode time; everything downstream matches on the variant.

use std::collections::BTreeMap;

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::errors::{Result, VaultKeepError};
use crate::store::{FieldMap, SEPARATOR};

/// Deepest nesting a backup file may hold, counting the top-level
/// mapping as level 1.  The JSON and YAML parsers both stop at 128.
pub const MAX_DEPTH: usize = 127;

/// Levels above a mount's entries: the top-level mapping and the mount.
const MOUNT_LEVELS: usize = 2;

/// Longest secret path that still fits in a backup file, for a secret
/// whose fields are all scalars.
pub const MAX_PATH_SEGMENTS: usize = MAX_DEPTH - MOUNT_LEVELS;

/// Split a store path into its non-empty segments.
///
/// `""` yields no segments, and leading, trailing or doubled
/// separators never produce empty ones.
pub fn segments_for(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Append `child` to `base` without introducing a leading separator.
pub fn join_path(base: &str, child: &str) -> String {
    let base = base.trim_matches(SEPARATOR);
    let child = child.trim_matches(SEPARATOR);
    if base.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        base.to_string()
    } else {
        format!("{base}{SEPARATOR}{child}")
    }
}

/// True iff `value` is a mapping none of whose direct values are mappings.
pub fn is_field_map(value: &Value) -> bool {
    value.as_object().is_some_and(holds_no_mappings)
}

fn holds_no_mappings(map: &Map<String, Value>) -> bool {
    !map.values().any(Value::is_object)
}

/// Levels of nesting `value` adds when written out; 0 for scalars.
pub fn value_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(value, 0)];
    while let Some((value, level)) = stack.pop() {
        match value {
            Value::Array(items) => {
                deepest = deepest.max(level + 1);
                stack.extend(items.iter().map(|child| (child, level + 1)));
            }
            Value::Object(map) => {
                deepest = deepest.max(level + 1);
                stack.extend(map.values().map(|child| (child, level + 1)));
            }
            _ => {}
        }
    }
    deepest
}

/// One entry of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// The literal data of one secret.
    FieldMap(FieldMap),
    /// A folder of further entries.
    Folder(Node),
    /// A bare value, only found in hand-written documents.  It stands
    /// for a field named by its key in a secret at the enclosing path.
    Scalar(Value),
}

impl NodeValue {
    /// Apply the structural rule to a decoded value.
    ///
    /// `depth` is the nesting level of `value` below its mount.
    pub fn classify(value: Value, depth: usize) -> Result<Self> {
        if value.is_object() && MOUNT_LEVELS + depth > MAX_DEPTH {
            return Err(VaultKeepError::InvalidDocument(format!(
                "nesting exceeds {MAX_DEPTH} levels"
            )));
        }
        match value {
            Value::Object(map) if holds_no_mappings(&map) => Ok(NodeValue::FieldMap(map)),
            Value::Object(map) => Ok(NodeValue::Folder(Node::from_map(map, depth + 1)?)),
            other => Ok(NodeValue::Scalar(other)),
        }
    }
}

/// A folder: segment name -> entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    entries: BTreeMap<String, NodeValue>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_map(map: Map<String, Value>, depth: usize) -> Result<Self> {
        let entries = map
            .into_iter()
            .map(|(key, value)| Ok((key, NodeValue::classify(value, depth)?)))
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: NodeValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&NodeValue> {
        self.entries.get(key)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A whole snapshot: mount name -> root node of that mount.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    mounts: BTreeMap<String, Node>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an untyped value, classifying every node.
    ///
    /// The top level must be a mapping and every mount must map to a
    /// mapping; a mount root is always a folder, never a field map.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(top) = value else {
            return Err(VaultKeepError::InvalidDocument(
                "expected a mapping of mount names at the top level".into(),
            ));
        };

        let mut mounts = BTreeMap::new();
        for (mount, root) in top {
            let Value::Object(map) = root else {
                return Err(VaultKeepError::InvalidDocument(format!(
                    "mount '{mount}' must map to a mapping of secrets"
                )));
            };
            mounts.insert(mount, Node::from_map(map, 1)?);
        }
        Ok(Self { mounts })
    }

    /// Place a fetched secret at `mount/path`.
    ///
    /// Folders along the way are created on demand.  Fails when the
    /// path is empty, when the secret would sit deeper than `MAX_DEPTH`
    /// in the written file, or when it collides with an existing secret
    /// or folder of the same name.
    pub fn insert_secret(&mut self, mount: &str, path: &str, fields: FieldMap) -> Result<()> {
        let result = self.try_insert(mount, path, fields);
        if result.is_err() && self.mounts.get(mount).is_some_and(Node::is_empty) {
            self.mounts.remove(mount);
        }
        result
    }

    fn try_insert(&mut self, mount: &str, path: &str, fields: FieldMap) -> Result<()> {
        let segments = segments_for(path);
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(VaultKeepError::InvalidDocument(format!(
                "cannot store a secret at the root of mount '{mount}'"
            )));
        };
        let depth = MOUNT_LEVELS
            + segments.len()
            + fields.values().map(value_depth).max().unwrap_or(0);
        if depth > MAX_DEPTH {
            return Err(VaultKeepError::InvalidDocument(format!(
                "{mount}/{path} would nest {depth} levels deep in the backup file (limit {MAX_DEPTH})"
            )));
        }

        let mut node = self.mounts.entry(mount.to_string()).or_default();
        for segment in parents {
            let slot = node
                .entries
                .entry((*segment).to_string())
                .or_insert_with(|| NodeValue::Folder(Node::new()));
            node = match slot {
                NodeValue::Folder(child) => child,
                _ => {
                    return Err(VaultKeepError::PathConflict(format!(
                        "{mount}/{path}: '{segment}' is already a secret"
                    )))
                }
            };
        }

        if let Some(NodeValue::Folder(_)) = node.entries.get(*leaf) {
            return Err(VaultKeepError::PathConflict(format!(
                "{mount}/{path}: a folder of the same name was captured"
            )));
        }
        node.entries
            .insert((*leaf).to_string(), NodeValue::FieldMap(fields));
        Ok(())
    }

    pub fn mount(&self, name: &str) -> Option<&Node> {
        self.mounts.get(name)
    }

    /// Mounts in name order.
    pub fn mounts(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.mounts.iter()
    }

    /// Insert or replace a whole mount.
    pub fn insert_mount(&mut self, name: impl Into<String>, node: Node) {
        self.mounts.insert(name.into(), node);
    }

    /// True when no mount holds any entry.
    pub fn is_empty(&self) -> bool {
        self.mounts.values().all(Node::is_empty)
    }

    /// Every field map in the document as `(mount, path, fields)`.
    ///
    /// Scalars are not included; they only become secrets once merged
    /// during restore.
    pub fn secrets(&self) -> Vec<(&str, String, &FieldMap)> {
        let mut out = Vec::new();
        for (mount, root) in &self.mounts {
            let mut stack = vec![(String::new(), root)];
            while let Some((path, node)) = stack.pop() {
                for (key, value) in node.iter() {
                    match value {
                        NodeValue::FieldMap(fields) => {
                            out.push((mount.as_str(), join_path(&path, key), fields))
                        }
                        NodeValue::Folder(child) => stack.push((join_path(&path, key), child)),
                        NodeValue::Scalar(_) => {}
                    }
                }
            }
        }
        out.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        out
    }
}

impl Serialize for NodeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NodeValue::FieldMap(fields) => fields.serialize(serializer),
            NodeValue::Folder(node) => node.serialize(serializer),
            NodeValue::Scalar(value) => value.serialize(serializer),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(&self.entries)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(&self.mounts)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(de::Error::custom)
    }
}
