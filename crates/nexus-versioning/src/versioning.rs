use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nexus_cas::CasStore;
use nexus_hash::Digest;
use nexus_metadata::{NormalizedPath, SnapshotRecord, Store as MetadataStore, VersionRecord, WorkspaceRecord, WriteOutcome};

use crate::error::Result;
use crate::types::{SnapshotRef, VersionDiff, WorkspaceDiff};

/// Orchestrates §4.6's per-path version chains and workspace snapshots on
/// top of `nexus-metadata`'s storage and `nexus-cas`'s refcounting. Neither
/// layer knows about the other; this crate is what makes `rollback` and
/// `workspace_restore` create new version rows that reference an
/// already-ingested digest rather than re-ingesting bytes.
pub struct Versioning {
    metadata: Arc<MetadataStore>,
    cas: Arc<CasStore>,
}

impl Versioning {
    pub fn new(metadata: Arc<MetadataStore>, cas: Arc<CasStore>) -> Self {
        Self { metadata, cas }
    }

    // ---- per-path version chains -------------------------------------------

    pub fn get_version(&self, tenant_id: &str, path: &NormalizedPath, version: u64) -> Result<VersionRecord> {
        Ok(self.metadata.get_version(tenant_id, path, version)?)
    }

    pub fn list_versions(&self, tenant_id: &str, path: &NormalizedPath) -> Vec<VersionRecord> {
        self.metadata.list_versions(tenant_id, path)
    }

    /// Appends a new version whose content is version `v`'s content,
    /// leaving the history itself intact (§4.6: "not destructive").
    pub fn rollback(&self, tenant_id: &str, path: &NormalizedPath, version: u64, created_by: Option<String>) -> Result<WriteOutcome> {
        let target = self.metadata.get_version(tenant_id, path, version)?;
        self.cas.incref(&target.content_digest)?;
        Ok(self.metadata.write_file(tenant_id, path, target.content_digest, target.size, None, false, created_by)?)
    }

    pub fn diff_versions(&self, tenant_id: &str, path: &NormalizedPath, v1: u64, v2: u64) -> Result<VersionDiff> {
        let a = self.metadata.get_version(tenant_id, path, v1)?;
        let b = self.metadata.get_version(tenant_id, path, v2)?;
        Ok(VersionDiff {
            from_version: v1,
            to_version: v2,
            size_delta: b.size as i64 - a.size as i64,
            digest_changed: a.content_digest != b.content_digest,
        })
    }

    // ---- workspaces ---------------------------------------------------------

    pub fn register_workspace(&self, record: WorkspaceRecord) -> Result<()> {
        Ok(self.metadata.register_workspace(record)?)
    }

    pub fn unregister_workspace(&self, tenant_id: &str, path: &NormalizedPath) -> Result<()> {
        Ok(self.metadata.unregister_workspace(tenant_id, path)?)
    }

    pub fn list_workspaces(&self, tenant_id: &str) -> Vec<WorkspaceRecord> {
        self.metadata.list_workspaces(tenant_id)
    }

    pub fn get_workspace_info(&self, tenant_id: &str, path: &NormalizedPath) -> Result<WorkspaceRecord> {
        Ok(self.metadata.get_workspace(tenant_id, path)?)
    }

    /// Every live (non-directory) file under `workspace_path`, as
    /// `(path, current_version)` pairs — the raw material for both a new
    /// snapshot's entries and the "current" side of a diff.
    fn live_entries(&self, tenant_id: &str, workspace_path: &NormalizedPath) -> Vec<(NormalizedPath, u64)> {
        self.metadata
            .list_recursive(tenant_id, workspace_path)
            .into_iter()
            .filter(|f| !f.is_directory)
            .map(|f| (f.path, f.current_version))
            .collect()
    }

    pub fn workspace_snapshot(&self, tenant_id: &str, workspace_path: &NormalizedPath, description: Option<String>, tags: Vec<String>) -> Result<SnapshotRecord> {
        self.metadata.get_workspace(tenant_id, workspace_path)?;
        let entries = self.live_entries(tenant_id, workspace_path);
        Ok(self.metadata.create_snapshot(tenant_id, workspace_path, entries, description, tags))
    }

    pub fn workspace_log(&self, tenant_id: &str, workspace_path: &NormalizedPath) -> Vec<SnapshotRecord> {
        self.metadata.list_snapshots(tenant_id, workspace_path)
    }

    /// Brings every path captured by `snapshot_number` back to its captured
    /// content by appending new versions (never in-place overwrites), and
    /// deletes paths that were added to the subtree after the snapshot was
    /// taken — without that second half, a `restore` followed immediately
    /// by a `snapshot` would not diff equal to the original (property 9).
    pub fn workspace_restore(&self, tenant_id: &str, workspace_path: &NormalizedPath, snapshot_number: u64, created_by: Option<String>) -> Result<()> {
        let snapshot = self.metadata.get_snapshot(tenant_id, workspace_path, snapshot_number)?;
        let snapshot_paths: HashSet<NormalizedPath> = snapshot.entries.iter().map(|(p, _)| p.clone()).collect();

        for (path, version) in &snapshot.entries {
            let target = self.metadata.get_version(tenant_id, path, *version)?;
            let unchanged = self
                .metadata
                .get_file(tenant_id, path)
                .ok()
                .and_then(|f| self.metadata.get_version(tenant_id, path, f.current_version).ok())
                .map(|current| current.content_digest == target.content_digest)
                .unwrap_or(false);
            if !unchanged {
                self.cas.incref(&target.content_digest)?;
                self.metadata.write_file(tenant_id, path, target.content_digest, target.size, None, false, created_by.clone())?;
            }
        }

        for (path, _) in self.live_entries(tenant_id, workspace_path) {
            if !snapshot_paths.contains(&path) {
                self.metadata.delete_file(tenant_id, &path)?;
            }
        }
        Ok(())
    }

    pub fn workspace_diff(&self, tenant_id: &str, workspace_path: &NormalizedPath, from: SnapshotRef, to: SnapshotRef) -> Result<WorkspaceDiff> {
        let from_map = self.resolve_digest_map(tenant_id, workspace_path, from)?;
        let to_map = self.resolve_digest_map(tenant_id, workspace_path, to)?;

        let mut added = Vec::new();
        let mut modified = Vec::new();
        for (path, digest) in &to_map {
            match from_map.get(path) {
                None => added.push(path.clone()),
                Some(old) if old != digest => modified.push(path.clone()),
                _ => {}
            }
        }
        let mut deleted: Vec<NormalizedPath> = from_map.keys().filter(|p| !to_map.contains_key(*p)).cloned().collect();

        added.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        modified.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        deleted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(WorkspaceDiff { added, modified, deleted })
    }

    fn resolve_digest_map(&self, tenant_id: &str, workspace_path: &NormalizedPath, reference: SnapshotRef) -> Result<HashMap<NormalizedPath, Digest>> {
        let entries = match reference {
            SnapshotRef::Current => self.live_entries(tenant_id, workspace_path),
            SnapshotRef::Number(number) => self.metadata.get_snapshot(tenant_id, workspace_path, number)?.entries,
        };
        Ok(entries
            .into_iter()
            .filter_map(|(path, version)| self.metadata.get_version(tenant_id, &path, version).ok().map(|v| (path, v.content_digest)))
            .collect())
    }
}
