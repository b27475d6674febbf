use chrono::Utc;
use nexus_hash::{Digest, ETag};

use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::{ChangeKind, FileRecord, NormalizedPath, VersionRecord};

/// Result of a successful write: the invariant 1 contract (current_version
/// resolves to exactly one version resolving to exactly one blob) made
/// visible to the caller.
pub struct WriteOutcome {
    pub etag: ETag,
    pub version: u64,
    pub size: u64,
    pub modified_at: chrono::DateTime<Utc>,
}

impl Store {
    pub fn get_file(&self, tenant_id: &str, path: &NormalizedPath) -> Result<FileRecord> {
        self.inner
            .read()
            .files
            .get(&(tenant_id.to_owned(), path.clone()))
            .cloned()
            .filter(|f| !f.deleted)
            .ok_or_else(|| MetadataError::FileNotFound(path.to_string()))
    }

    pub fn file_exists(&self, tenant_id: &str, path: &NormalizedPath) -> bool {
        self.inner
            .read()
            .files
            .get(&(tenant_id.to_owned(), path.clone()))
            .map(|f| !f.deleted)
            .unwrap_or(false)
    }

    /// Lists direct children of `parent` (non-recursive), ordered by path as
    /// required by §4.8.
    pub fn list_children(&self, tenant_id: &str, parent: &NormalizedPath) -> Vec<FileRecord> {
        let inner = self.inner.read();
        let mut out: Vec<FileRecord> = inner
            .files
            .values()
            .filter(|f| f.tenant_id == tenant_id && !f.deleted && f.path.parent().as_ref() == Some(parent))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        out
    }

    /// Lists every file under `root` (including `root` itself if it is a
    /// file), ordered by path.
    pub fn list_recursive(&self, tenant_id: &str, root: &NormalizedPath) -> Vec<FileRecord> {
        let inner = self.inner.read();
        let prefix = if root.is_root() {
            "/".to_owned()
        } else {
            format!("{}/", root.as_str())
        };
        let mut out: Vec<FileRecord> = inner
            .files
            .values()
            .filter(|f| {
                f.tenant_id == tenant_id
                    && !f.deleted
                    && (f.path == *root || f.path.as_str().starts_with(&prefix))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        out
    }

    pub fn create_directory(&self, tenant_id: &str, path: &NormalizedPath, exist_ok: bool) -> Result<FileRecord> {
        let mut inner = self.inner.write();
        let key = (tenant_id.to_owned(), path.clone());
        if let Some(existing) = inner.files.get(&key) {
            if !existing.deleted {
                if exist_ok && existing.is_directory {
                    return Ok(existing.clone());
                }
                return Err(MetadataError::FileExists(path.to_string()));
            }
        }
        let now = Utc::now();
        let record = FileRecord {
            tenant_id: tenant_id.to_owned(),
            path: path.clone(),
            current_version: 0,
            etag: ETag::derive(&Digest::of(path.as_str().as_bytes()), 0),
            size: 0,
            created_at: now,
            modified_at: now,
            content_type: None,
            is_directory: true,
            mount_id: None,
            tags: Vec::new(),
            deleted: false,
        };
        inner.files.insert(key, record.clone());
        Store::emit(&mut inner, ChangeKind::Created, tenant_id, path, None, None);
        Ok(record)
    }

    /// Writes a new version of `path`. `if_match` / `if_none_match`
    /// implement the optimistic-concurrency preconditions of §4.8; exactly
    /// one of a set of racing calls with the same `if_match` can succeed
    /// because the whole operation runs under the store's single write lock
    /// (invariant 3, property 4).
    #[allow(clippy::too_many_arguments)]
    pub fn write_file(
        &self,
        tenant_id: &str,
        path: &NormalizedPath,
        content_digest: Digest,
        size: u64,
        if_match: Option<ETag>,
        if_none_match: bool,
        created_by: Option<String>,
    ) -> Result<WriteOutcome> {
        let mut inner = self.inner.write();
        let key = (tenant_id.to_owned(), path.clone());
        // `existing_any` includes a tombstoned record: the version chain must
        // keep advancing past whatever a soft-deleted file last reached, or a
        // write that resurrects a deleted path reuses version numbers already
        // sitting in `inner.versions[key]` (duplicate `version` rows, and
        // `get_version` silently resolving to the older one). `existing_live`
        // is the "is there a file here right now" view the preconditions care
        // about.
        let existing_any = inner.files.get(&key).cloned();
        let existing_live = existing_any.clone().filter(|f| !f.deleted);

        if if_none_match && existing_live.is_some() {
            return Err(MetadataError::FileExists(path.to_string()));
        }
        if let Some(expected) = if_match {
            match &existing_live {
                Some(f) if f.etag == expected => {}
                _ => return Err(MetadataError::PreconditionFailed { path: path.to_string() }),
            }
        }

        let next_version = existing_any.as_ref().map(|f| f.current_version + 1).unwrap_or(1);
        let etag = ETag::derive(&content_digest, next_version);
        let now = Utc::now();

        let version_row = VersionRecord {
            tenant_id: tenant_id.to_owned(),
            path: path.clone(),
            version: next_version,
            content_digest,
            size,
            created_at: now,
            created_by,
            parent_version: existing_any.as_ref().map(|f| f.current_version).filter(|v| *v > 0),
            description: None,
        };
        inner.versions.entry(key.clone()).or_default().push(version_row);

        let record = FileRecord {
            tenant_id: tenant_id.to_owned(),
            path: path.clone(),
            current_version: next_version,
            etag,
            size,
            created_at: existing_live.as_ref().map(|f| f.created_at).unwrap_or(now),
            modified_at: now,
            content_type: existing_live.as_ref().and_then(|f| f.content_type.clone()),
            is_directory: false,
            mount_id: existing_live.as_ref().and_then(|f| f.mount_id.clone()),
            tags: existing_live.map(|f| f.tags).unwrap_or_default(),
            deleted: false,
        };
        inner.files.insert(key, record.clone());

        let kind = if next_version == 1 { ChangeKind::Created } else { ChangeKind::Modified };
        Store::emit(&mut inner, kind, tenant_id, path, None, None);

        Ok(WriteOutcome {
            etag: record.etag,
            version: record.current_version,
            size: record.size,
            modified_at: record.modified_at,
        })
    }

    /// Soft-deletes a file: marks it tombstoned so `read`/`list`/`exists`
    /// stop surfacing it, without purging its version rows (see
    /// SPEC_FULL.md "Supplemented detail" #2).
    pub fn delete_file(&self, tenant_id: &str, path: &NormalizedPath) -> Result<()> {
        let mut inner = self.inner.write();
        let key = (tenant_id.to_owned(), path.clone());
        let record = inner
            .files
            .get_mut(&key)
            .filter(|f| !f.deleted)
            .ok_or_else(|| MetadataError::FileNotFound(path.to_string()))?;
        record.deleted = true;
        Store::emit(&mut inner, ChangeKind::Deleted, tenant_id, path, None, None);
        Ok(())
    }

    /// Renames `old` to `new` in place: the file and version rows move to
    /// the new key, preserving the version chain; the caller is responsible
    /// for the ReBAC tuple rewrite (nexus-rebac owns tuple storage).
    pub fn rename_file(&self, tenant_id: &str, old: &NormalizedPath, new: &NormalizedPath) -> Result<()> {
        let mut inner = self.inner.write();
        let old_key = (tenant_id.to_owned(), old.clone());
        let new_key = (tenant_id.to_owned(), new.clone());

        if inner.files.get(&new_key).map(|f| !f.deleted).unwrap_or(false) {
            return Err(MetadataError::FileExists(new.to_string()));
        }
        let mut record = inner
            .files
            .remove(&old_key)
            .filter(|f| !f.deleted)
            .ok_or_else(|| MetadataError::FileNotFound(old.to_string()))?;
        record.path = new.clone();
        inner.files.insert(new_key.clone(), record);

        if let Some(mut versions) = inner.versions.remove(&old_key) {
            for v in &mut versions {
                v.path = new.clone();
            }
            inner.versions.insert(new_key, versions);
        }

        Store::emit(&mut inner, ChangeKind::Renamed, tenant_id, new, Some(old.clone()), None);
        Ok(())
    }
}
