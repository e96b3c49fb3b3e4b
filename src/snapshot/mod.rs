//! Snapshot module: the secret-tree synchronization engine.
//!
//! This module provides:
//! - The nested `Document` model and its structural rule (`document`)
//! - Store → document traversal (`capture`)
//! - Document → store traversal (`restore`)
//! - Per-run success/failure accounting (`report`)
//! - JSON/YAML encoding, the encryption envelope and backup files (`format`)

pub mod capture;
pub mod document;
pub mod format;
pub mod report;
pub mod restore;

pub use capture::{capture, CaptureOutcome};
pub use document::{
    is_field_map, join_path, segments_for, value_depth, Document, Node, NodeValue, MAX_DEPTH,
    MAX_PATH_SEGMENTS,
};
pub use format::SnapshotFormat;
pub use report::{SkippedMount, SyncFailure, SyncReport};
pub use restore::{restore, RestoreOptions};
