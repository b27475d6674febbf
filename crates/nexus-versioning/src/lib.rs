mod error;
mod types;
mod versioning;

pub use error::{Result, VersioningError};
pub use types::{SnapshotRef, VersionDiff, WorkspaceDiff};
pub use versioning::Versioning;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use nexus_blob::Memory;
    use nexus_cas::CasStore;
    use nexus_hash::Digest;
    use nexus_metadata::{NormalizedPath, Store as MetadataStore, WorkspaceRecord};

    use super::*;

    fn path(s: &str) -> NormalizedPath {
        nexus_metadata::normalize(s).unwrap()
    }

    fn fixture() -> (Versioning, Arc<MetadataStore>, Arc<CasStore>) {
        let metadata = Arc::new(MetadataStore::new());
        let cas = Arc::new(CasStore::new(Arc::new(Memory::new()), metadata.clone(), "memory"));
        (Versioning::new(metadata.clone(), cas.clone()), metadata, cas)
    }

    fn write(metadata: &MetadataStore, cas: &CasStore, tenant: &str, p: &NormalizedPath, bytes: &[u8]) {
        let digest = Digest::of(bytes);
        metadata.register_blob(digest, bytes.len() as u64, "memory", &digest.to_hex(), None);
        cas.incref(&digest).unwrap();
        metadata.write_file(tenant, p, digest, bytes.len() as u64, None, false, None).unwrap();
    }

    #[test]
    fn rollback_appends_a_new_version_with_old_content() {
        let (versioning, metadata, cas) = fixture();
        let p = path("/x.txt");
        write(&metadata, &cas, "t", &p, b"hello");
        write(&metadata, &cas, "t", &p, b"world");

        let outcome = versioning.rollback("t", &p, 1, None).unwrap();
        assert_eq!(outcome.version, 3);
        let v3 = versioning.get_version("t", &p, 3).unwrap();
        assert_eq!(v3.content_digest, Digest::of(b"hello"));
    }

    #[test]
    fn diff_versions_reports_digest_change_and_size_delta() {
        let (versioning, metadata, cas) = fixture();
        let p = path("/x.txt");
        write(&metadata, &cas, "t", &p, b"hi");
        write(&metadata, &cas, "t", &p, b"hello there");

        let diff = versioning.diff_versions("t", &p, 1, 2).unwrap();
        assert!(diff.digest_changed);
        assert_eq!(diff.size_delta, 11 - 2);
    }

    fn workspace(tenant: &str, p: &NormalizedPath) -> WorkspaceRecord {
        WorkspaceRecord {
            tenant_id: tenant.to_owned(),
            path: p.clone(),
            name: "main".to_owned(),
            description: None,
            created_by: None,
            created_at: Utc::now(),
            metadata: None,
            tags: vec![],
            session_id: None,
            ttl_expires_at: None,
        }
    }

    #[test]
    fn snapshot_round_trip_matches_worked_example_s5() {
        let (versioning, metadata, cas) = fixture();
        let ws = path("/w");
        versioning.register_workspace(workspace("t", &ws)).unwrap();
        write(&metadata, &cas, "t", &path("/w/a"), b"a1");
        write(&metadata, &cas, "t", &path("/w/b"), b"b1");

        let snap = versioning.workspace_snapshot("t", &ws, None, vec![]).unwrap();
        assert_eq!(snap.snapshot_number, 1);
        assert_eq!(snap.file_count(), 2);

        write(&metadata, &cas, "t", &path("/w/a"), b"a2");
        metadata.delete_file("t", &path("/w/b")).unwrap();
        write(&metadata, &cas, "t", &path("/w/c"), b"c1");

        let diff = versioning.workspace_diff("t", &ws, SnapshotRef::Number(1), SnapshotRef::Current).unwrap();
        assert_eq!(diff.added, vec![path("/w/c")]);
        assert_eq!(diff.modified, vec![path("/w/a")]);
        assert_eq!(diff.deleted, vec![path("/w/b")]);

        versioning.workspace_restore("t", &ws, 1, None).unwrap();
        let after = versioning.workspace_diff("t", &ws, SnapshotRef::Number(1), SnapshotRef::Current).unwrap();
        assert!(after.added.is_empty());
        assert!(after.modified.is_empty());
        assert!(after.deleted.is_empty());
    }

    #[test]
    fn restoring_and_resnapshotting_diffs_equal_modulo_number() {
        let (versioning, metadata, cas) = fixture();
        let ws = path("/w");
        versioning.register_workspace(workspace("t", &ws)).unwrap();
        write(&metadata, &cas, "t", &path("/w/a"), b"a1");
        versioning.workspace_snapshot("t", &ws, None, vec![]).unwrap();

        write(&metadata, &cas, "t", &path("/w/a"), b"a2");
        versioning.workspace_restore("t", &ws, 1, None).unwrap();
        let snap2 = versioning.workspace_snapshot("t", &ws, None, vec![]).unwrap();
        assert_eq!(snap2.snapshot_number, 2);

        let diff = versioning.workspace_diff("t", &ws, SnapshotRef::Number(1), SnapshotRef::Number(2)).unwrap();
        assert!(diff.added.is_empty());
        assert!(diff.modified.is_empty());
        assert!(diff.deleted.is_empty());
    }
}
