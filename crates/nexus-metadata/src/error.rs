use thiserror::Error;

/// Error kinds surfaced by the metadata store. Names describe the kind, not
/// a wire code — `nexus-rpc` maps each of these onto the bit-exact JSON-RPC
/// error codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("file already exists: {0}")]
    FileExists(String),
    #[error("directory not empty: {0}")]
    DirNotEmpty(String),
    #[error("version {version} not found for path {path}")]
    VersionNotFound { path: String, version: u64 },
    #[error("etag precondition failed for {path}")]
    PreconditionFailed { path: String },
    #[error("blob not found: {0}")]
    BlobNotFound(String),
    #[error("blob integrity mismatch: expected {expected}, recomputed {actual}")]
    BlobIntegrity { expected: String, actual: String },
    #[error("mount not found: {0}")]
    MountNotFound(String),
    #[error("mount prefix collides with existing mount: {0}")]
    MountCollision(String),
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),
    #[error("workspace already registered: {0}")]
    WorkspaceExists(String),
    #[error("snapshot not found: {workspace} #{number}")]
    SnapshotNotFound { workspace: String, number: u64 },
    #[error("tuple not found: {0}")]
    TupleNotFound(String),
    #[error("api key not found: {0}")]
    KeyNotFound(String),
    #[error("cannot revoke or downgrade the last remaining admin key")]
    LastAdmin,
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
