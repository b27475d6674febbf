use nexus_metadata::NormalizedPath;
use serde::{Deserialize, Serialize};

/// Which point in a workspace's history `workspace_diff` should read from:
/// a captured snapshot, or the subtree's live state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotRef {
    Number(u64),
    Current,
}

/// Result of comparing two versions of the same path (§4.8 `diff_versions`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub from_version: u64,
    pub to_version: u64,
    pub size_delta: i64,
    pub digest_changed: bool,
}

/// Result of comparing two points in a workspace's history (§4.6
/// `workspace_diff`), by set-differencing the path→digest maps each side
/// resolves to. Paths whose captured version number changed but whose
/// content digest did not (e.g. a no-op `rollback`) are not reported as
/// modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDiff {
    pub added: Vec<NormalizedPath>,
    pub modified: Vec<NormalizedPath>,
    pub deleted: Vec<NormalizedPath>,
}
