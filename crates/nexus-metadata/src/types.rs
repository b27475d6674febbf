use chrono::{DateTime, Utc};
use nexus_hash::{Digest, ETag};
use serde::{Deserialize, Serialize};

pub type TenantId = String;

/// Canonical, validated absolute path: begins with `/`, no `.`/`..`
/// components, no empty components, case-sensitive, capped at 4096 bytes.
/// A trailing `/` in user input denotes directory form but is normalized
/// away in storage; `is_directory` on the file record is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NormalizedPath(pub(crate) String);

impl NormalizedPath {
    pub fn root() -> NormalizedPath {
        NormalizedPath("/".to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parent(&self) -> Option<NormalizedPath> {
        if self.0 == "/" {
            return None;
        }
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) => Some(NormalizedPath("/".to_owned())),
            Some(idx) => Some(NormalizedPath(trimmed[..idx].to_owned())),
            None => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    pub fn join(&self, child: &str) -> NormalizedPath {
        if self.0 == "/" {
            NormalizedPath(format!("/{child}"))
        } else {
            NormalizedPath(format!("{}/{child}", self.0))
        }
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub tenant_id: TenantId,
    pub path: NormalizedPath,
    pub current_version: u64,
    pub etag: ETag,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub content_type: Option<String>,
    pub is_directory: bool,
    pub mount_id: Option<String>,
    pub tags: Vec<String>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub tenant_id: TenantId,
    pub path: NormalizedPath,
    pub version: u64,
    pub content_digest: Digest,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub parent_version: Option<u64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub content_digest: Digest,
    pub size: u64,
    pub backend_id: String,
    pub backend_key: String,
    pub refcount: u64,
    pub chunk_manifest: Option<Digest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRecord {
    pub tenant_id: TenantId,
    pub mount_point: NormalizedPath,
    pub backend_id: String,
    pub backend_config_blob: Option<String>,
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub tenant_id: TenantId,
    pub path: NormalizedPath,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
    pub tags: Vec<String>,
    pub session_id: Option<String>,
    pub ttl_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub tenant_id: TenantId,
    pub workspace_path: NormalizedPath,
    pub snapshot_number: u64,
    pub created_at: DateTime<Utc>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// `(path, version)` pairs captured at snapshot time.
    pub entries: Vec<(NormalizedPath, u64)>,
}

impl SnapshotRecord {
    pub fn file_count(&self) -> u64 {
        self.entries.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tuple {
    pub tuple_id: String,
    pub tenant_id: TenantId,
    pub subject_type: String,
    pub subject_id: String,
    pub relation: String,
    pub object_type: String,
    pub object_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub condition: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tuple {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|e| e <= now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_type: String,
    pub entity_id: String,
    pub parent_type: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed,
    PermChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub seq: u64,
    pub tenant_id: TenantId,
    pub kind: ChangeKind,
    pub path: NormalizedPath,
    pub old_path: Option<NormalizedPath>,
    pub at: DateTime<Utc>,
    pub actor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub key_id: String,
    pub key_hash: String,
    pub is_admin: bool,
    pub subject_type: String,
    pub subject_id: String,
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}
