use std::collections::HashMap;
use std::sync::Arc;

use nexus_cas::CasStore;
use nexus_metadata::{ChangeKind, NormalizedPath, Store as MetadataStore};
use nexus_namespace::Router;
use nexus_rebac::{Consistency, Decision, Engine as RebacEngine, Entity};
use nexus_versioning::Versioning;

use crate::error::{FileServiceError, Result};
use crate::grep::grep_file;
use crate::types::{GrepHit, GrepOptions, ListEntry, ListOptions, MkdirOptions, ReadResult, Stat, WriteOptions, WriteResult};

/// Composes the path namespace, the permission engine, and content-addressed
/// storage into the public operations table of §4.8. Every operation checks
/// the required permission before touching storage; nothing here mutates
/// state on a denied check.
pub struct FileService {
    metadata: Arc<MetadataStore>,
    router: Arc<Router>,
    rebac: RebacEngine,
    versioning: Arc<Versioning>,
    backends: HashMap<String, Arc<CasStore>>,
}

impl FileService {
    pub fn new(metadata: Arc<MetadataStore>, router: Arc<Router>, rebac: RebacEngine, versioning: Arc<Versioning>, backends: HashMap<String, Arc<CasStore>>) -> Self {
        Self { metadata, router, rebac, versioning, backends }
    }

    fn backend(&self, backend_id: &str) -> Result<&Arc<CasStore>> {
        self.backends.get(backend_id).ok_or_else(|| FileServiceError::BackendNotConfigured(backend_id.to_owned()))
    }

    async fn authorize(&self, tenant_id: &str, subject: &Entity, permission: &str, object: &Entity) -> Result<()> {
        let outcome = self
            .rebac
            .check(tenant_id, subject.clone(), permission.to_owned(), object.clone(), Consistency::MinimizeLatency)
            .await?;
        match outcome.decision {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(FileServiceError::PermissionDenied {
                subject: format!("{}:{}", subject.entity_type, subject.entity_id),
                permission: permission.to_owned(),
                object: format!("{}:{}", object.entity_type, object.entity_id),
            }),
            Decision::Indeterminate => Err(FileServiceError::PermissionIndeterminate(
                outcome.reason.unwrap_or_else(|| "budget exceeded".to_owned()),
            )),
        }
    }

    fn file_object(path: &NormalizedPath) -> Entity {
        Entity::new("file", path.as_str())
    }

    // ---- read / exists / get_metadata --------------------------------------

    pub async fn read(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath, return_metadata: bool) -> Result<ReadResult> {
        self.authorize(tenant_id, subject, "read", &Self::file_object(path)).await?;
        let file = self.metadata.get_file(tenant_id, path)?;
        let version = self.metadata.get_version(tenant_id, path, file.current_version)?;
        let resolution = self.router.resolve(tenant_id, path);
        let bytes = self.backend(&resolution.backend_id)?.get(&version.content_digest).await?;
        let metadata = if return_metadata { Some(self.stat_from(&file, Some(&version))) } else { None };
        Ok(ReadResult { bytes, metadata })
    }

    pub async fn exists(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath) -> Result<bool> {
        self.authorize(tenant_id, subject, "read", &Self::file_object(path)).await?;
        Ok(self.metadata.file_exists(tenant_id, path))
    }

    pub async fn get_metadata(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath) -> Result<Stat> {
        self.authorize(tenant_id, subject, "read", &Self::file_object(path)).await?;
        let file = self.metadata.get_file(tenant_id, path)?;
        let version = if file.is_directory { None } else { Some(self.metadata.get_version(tenant_id, path, file.current_version)?) };
        Ok(self.stat_from(&file, version.as_ref()))
    }

    fn stat_from(&self, file: &nexus_metadata::FileRecord, version: Option<&nexus_metadata::VersionRecord>) -> Stat {
        Stat {
            path: file.path.clone(),
            is_directory: file.is_directory,
            size: file.size,
            version: file.current_version,
            etag: (!file.is_directory).then_some(file.etag),
            content_digest: version.map(|v| v.content_digest),
            content_type: file.content_type.clone(),
            created_at: file.created_at,
            modified_at: file.modified_at,
            tags: file.tags.clone(),
        }
    }

    // ---- write / delete / rename -------------------------------------------

    pub async fn write(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath, bytes: &[u8], options: WriteOptions) -> Result<WriteResult> {
        let is_new = !self.metadata.file_exists(tenant_id, path);
        if is_new {
            let parent = path.parent().unwrap_or_else(NormalizedPath::root);
            self.authorize(tenant_id, subject, "create", &Self::file_object(&parent)).await?;
        } else {
            self.authorize(tenant_id, subject, "write", &Self::file_object(path)).await?;
        }

        let resolution = self.router.resolve_for_write(tenant_id, path)?;
        let cas = self.backend(&resolution.backend_id)?;
        let digest = cas.put(bytes).await?;
        cas.incref(&digest)?;

        let outcome = self
            .metadata
            .write_file(tenant_id, path, digest, bytes.len() as u64, options.if_match, options.if_none_match, options.created_by);
        let outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                cas.decref(&digest)?;
                return Err(e.into());
            }
        };
        Ok(WriteResult { etag: outcome.etag, version: outcome.version, size: outcome.size, modified_at: outcome.modified_at })
    }

    pub async fn delete(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath) -> Result<()> {
        self.authorize(tenant_id, subject, "delete", &Self::file_object(path)).await?;
        let file = self.metadata.get_file(tenant_id, path)?;
        if !file.is_directory {
            let resolution = self.router.resolve(tenant_id, path);
            if let Ok(version) = self.metadata.get_version(tenant_id, path, file.current_version) {
                let _ = self.backend(&resolution.backend_id)?.decref(&version.content_digest)?;
            }
        }
        self.metadata.delete_file(tenant_id, path)?;
        Ok(())
    }

    pub async fn rename(&self, tenant_id: &str, subject: &Entity, old: &NormalizedPath, new: &NormalizedPath) -> Result<()> {
        self.authorize(tenant_id, subject, "delete", &Self::file_object(old)).await?;
        let new_parent = new.parent().unwrap_or_else(NormalizedPath::root);
        self.authorize(tenant_id, subject, "create", &Self::file_object(&new_parent)).await?;

        self.metadata.rename_file(tenant_id, old, new)?;
        self.metadata.rewrite_file_object_ids(tenant_id, old.as_str(), new.as_str());
        self.rebac.invalidate(tenant_id, &Self::file_object(old));
        self.rebac.invalidate(tenant_id, &Self::file_object(new));
        Ok(())
    }

    // ---- directories --------------------------------------------------------

    pub async fn mkdir(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath, options: MkdirOptions) -> Result<Vec<nexus_metadata::FileRecord>> {
        if let Ok(existing) = self.metadata.get_file(tenant_id, path) {
            if options.exist_ok && existing.is_directory {
                return Ok(vec![existing]);
            }
            return Err(FileServiceError::Metadata(nexus_metadata::MetadataError::FileExists(path.to_string())));
        }

        let mut missing = vec![path.clone()];
        let mut cursor = path.clone();
        while let Some(parent) = cursor.parent() {
            if parent.is_root() || self.metadata.file_exists(tenant_id, &parent) {
                break;
            }
            missing.push(parent.clone());
            cursor = parent;
        }
        if missing.len() > 1 && !options.parents {
            let immediate_parent = path.parent().unwrap_or_else(NormalizedPath::root);
            return Err(FileServiceError::Metadata(nexus_metadata::MetadataError::FileNotFound(immediate_parent.to_string())));
        }
        missing.reverse();

        let create_root_parent = missing[0].parent().unwrap_or_else(NormalizedPath::root);
        self.authorize(tenant_id, subject, "create", &Self::file_object(&create_root_parent)).await?;

        let mut created = Vec::new();
        for ancestor in &missing {
            created.push(self.metadata.create_directory(tenant_id, ancestor, options.exist_ok)?);
        }
        Ok(created)
    }

    pub async fn rmdir(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath, recursive: bool) -> Result<()> {
        self.authorize(tenant_id, subject, "delete", &Self::file_object(path)).await?;
        let children = self.metadata.list_children(tenant_id, path);
        if !children.is_empty() && !recursive {
            return Err(FileServiceError::Metadata(nexus_metadata::MetadataError::DirNotEmpty(path.to_string())));
        }
        if recursive {
            let mut entries = self.metadata.list_recursive(tenant_id, path);
            entries.sort_by(|a, b| b.path.as_str().len().cmp(&a.path.as_str().len()));
            for entry in entries {
                if entry.path == *path {
                    continue;
                }
                if entry.is_directory {
                    self.metadata.delete_file(tenant_id, &entry.path)?;
                } else {
                    self.delete(tenant_id, subject, &entry.path).await?;
                }
            }
        }
        self.metadata.delete_file(tenant_id, path)?;
        Ok(())
    }

    // ---- list / glob / grep --------------------------------------------------

    pub async fn list(&self, tenant_id: &str, subject: &Entity, path: &NormalizedPath, options: ListOptions) -> Result<Vec<ListEntry>> {
        self.authorize(tenant_id, subject, "read", &Self::file_object(path)).await?;
        let records = if options.recursive {
            self.metadata.list_recursive(tenant_id, path)
        } else {
            self.metadata.list_children(tenant_id, path)
        };

        let mut entries = Vec::new();
        for record in records {
            if let Some(prefix) = &options.prefix {
                if !record.path.as_str().starts_with(prefix.as_str()) {
                    continue;
                }
            }
            let object = Self::file_object(&record.path);
            if self.authorize(tenant_id, subject, "read", &object).await.is_err() {
                continue;
            }
            let details = options.details.then(|| self.stat_from(&record, None));
            entries.push(ListEntry { path: record.path, details });
        }
        entries.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        Ok(entries)
    }

    pub async fn glob(&self, tenant_id: &str, subject: &Entity, pattern: &str, root: Option<&NormalizedPath>) -> Result<Vec<NormalizedPath>> {
        let matcher = glob::Pattern::new(pattern).map_err(|e| FileServiceError::InvalidPattern(e.to_string()))?;
        let root = root.cloned().unwrap_or_else(NormalizedPath::root);
        let mut matches = Vec::new();
        for record in self.metadata.list_recursive(tenant_id, &root) {
            if record.is_directory {
                continue;
            }
            if !matcher.matches(record.path.as_str()) {
                continue;
            }
            let object = Self::file_object(&record.path);
            if self.authorize(tenant_id, subject, "read", &object).await.is_ok() {
                matches.push(record.path);
            }
        }
        matches.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(matches)
    }

    pub async fn grep(&self, tenant_id: &str, subject: &Entity, pattern: &str, root: Option<&NormalizedPath>, options: GrepOptions) -> Result<Vec<GrepHit>> {
        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(options.ignore_case)
            .build()
            .map_err(|e| FileServiceError::InvalidPattern(e.to_string()))?;
        let file_matcher = match &options.file_pattern {
            Some(p) => Some(glob::Pattern::new(p).map_err(|e| FileServiceError::InvalidPattern(e.to_string()))?),
            None => None,
        };
        let root = root.cloned().unwrap_or_else(NormalizedPath::root);
        let limit = options.max_results.unwrap_or(usize::MAX);

        let mut hits = Vec::new();
        for record in self.metadata.list_recursive(tenant_id, &root) {
            if hits.len() >= limit {
                break;
            }
            if record.is_directory {
                continue;
            }
            if let Some(matcher) = &file_matcher {
                if !matcher.matches(record.path.as_str()) {
                    continue;
                }
            }
            let object = Self::file_object(&record.path);
            if self.authorize(tenant_id, subject, "read", &object).await.is_err() {
                continue;
            }
            let resolution = self.router.resolve(tenant_id, &record.path);
            let version = self.metadata.get_version(tenant_id, &record.path, record.current_version)?;
            let bytes = self.backend(&resolution.backend_id)?.get(&version.content_digest).await?;
            hits.extend(grep_file(&record.path, &bytes, &regex, limit - hits.len()));
        }
        Ok(hits)
    }

    pub fn versioning(&self) -> &Versioning {
        &self.versioning
    }

    pub fn record_event(&self, tenant_id: &str, kind: ChangeKind, path: &NormalizedPath, old_path: Option<NormalizedPath>, actor: Option<String>) {
        self.metadata.record_event(tenant_id, kind, path.clone(), old_path, actor);
    }
}
