use chrono::{DateTime, Utc};
use nexus_hash::{Digest, ETag};
use nexus_metadata::NormalizedPath;
use serde::{Deserialize, Serialize};

/// Optional preconditions and flags accepted by [`crate::FileService::write`].
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub if_match: Option<ETag>,
    pub if_none_match: bool,
    pub created_by: Option<String>,
}

/// `{etag, version, size, modified_at}` — the §4.8 `write` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub etag: ETag,
    pub version: u64,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
}

/// Bytes plus, optionally, the stat record that `return_metadata=true`
/// requests alongside them.
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub bytes: Vec<u8>,
    pub metadata: Option<Stat>,
}

/// The `get_metadata` stat record (§4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub path: NormalizedPath,
    pub is_directory: bool,
    pub size: u64,
    pub version: u64,
    pub etag: Option<ETag>,
    pub content_digest: Option<Digest>,
    pub content_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// One entry returned by `list`: always a path, with the full [`Stat`]
/// attached when the caller asked for `details=true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub path: NormalizedPath,
    pub details: Option<Stat>,
}

/// One `list` or `glob` invocation's shape.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub recursive: bool,
    pub details: bool,
    pub prefix: Option<String>,
}

/// One `grep` match: `{path, line, content, match}` per §4.8.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrepHit {
    pub path: NormalizedPath,
    pub line: u64,
    pub content: String,
    pub matched: String,
}

#[derive(Debug, Clone, Default)]
pub struct GrepOptions {
    pub file_pattern: Option<String>,
    pub ignore_case: bool,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MkdirOptions {
    pub parents: bool,
    pub exist_ok: bool,
}
