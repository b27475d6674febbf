use chrono::Utc;

use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::{NormalizedPath, SnapshotRecord};

impl Store {
    /// Creates the next snapshot number for `workspace_path` (numbers never
    /// repeat, matching `NORMAL-EX`'s `Snapshot::generate_id` append-only
    /// numbering), capturing `entries` as the `(path, version)` pairs live
    /// under the workspace at this instant.
    pub fn create_snapshot(
        &self,
        tenant_id: &str,
        workspace_path: &NormalizedPath,
        entries: Vec<(NormalizedPath, u64)>,
        description: Option<String>,
        tags: Vec<String>,
    ) -> SnapshotRecord {
        let mut inner = self.inner.write();
        let key = (tenant_id.to_owned(), workspace_path.clone());
        let next_number = inner.snapshots.get(&key).map(|s| s.len() as u64 + 1).unwrap_or(1);
        let record = SnapshotRecord {
            tenant_id: tenant_id.to_owned(),
            workspace_path: workspace_path.clone(),
            snapshot_number: next_number,
            created_at: Utc::now(),
            description,
            tags,
            entries,
        };
        inner.snapshots.entry(key).or_default().push(record.clone());
        record
    }

    pub fn get_snapshot(&self, tenant_id: &str, workspace_path: &NormalizedPath, number: u64) -> Result<SnapshotRecord> {
        self.inner
            .read()
            .snapshots
            .get(&(tenant_id.to_owned(), workspace_path.clone()))
            .and_then(|snaps| snaps.iter().find(|s| s.snapshot_number == number))
            .cloned()
            .ok_or_else(|| MetadataError::SnapshotNotFound {
                workspace: workspace_path.to_string(),
                number,
            })
    }

    pub fn list_snapshots(&self, tenant_id: &str, workspace_path: &NormalizedPath) -> Vec<SnapshotRecord> {
        self.inner
            .read()
            .snapshots
            .get(&(tenant_id.to_owned(), workspace_path.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Deleting a snapshot releases its references; any `(path, version)`
    /// pair referenced only by the deleted snapshot becomes eligible for
    /// version/blob reclamation by the caller.
    pub fn delete_snapshot(&self, tenant_id: &str, workspace_path: &NormalizedPath, number: u64) -> Result<SnapshotRecord> {
        let mut inner = self.inner.write();
        let key = (tenant_id.to_owned(), workspace_path.clone());
        let snaps = inner
            .snapshots
            .get_mut(&key)
            .ok_or_else(|| MetadataError::SnapshotNotFound {
                workspace: workspace_path.to_string(),
                number,
            })?;
        let idx = snaps
            .iter()
            .position(|s| s.snapshot_number == number)
            .ok_or_else(|| MetadataError::SnapshotNotFound {
                workspace: workspace_path.to_string(),
                number,
            })?;
        Ok(snaps.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> NormalizedPath {
        crate::path::normalize(s).unwrap()
    }

    #[test]
    fn snapshot_numbers_never_repeat() {
        let store = Store::new();
        let ws = path("/w");
        let s1 = store.create_snapshot("t", &ws, vec![], None, vec![]);
        let s2 = store.create_snapshot("t", &ws, vec![], None, vec![]);
        assert_eq!(s1.snapshot_number, 1);
        assert_eq!(s2.snapshot_number, 2);
    }

    #[test]
    fn delete_then_list_excludes_it() {
        let store = Store::new();
        let ws = path("/w");
        store.create_snapshot("t", &ws, vec![], None, vec![]);
        store.delete_snapshot("t", &ws, 1).unwrap();
        assert!(store.list_snapshots("t", &ws).is_empty());
    }
}
