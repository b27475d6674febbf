use thiserror::Error;

/// Error kinds surfaced by the file service. Named after the taxonomy kinds,
/// not the wire codes — `nexus-rpc` maps each variant onto the bit-exact
/// JSON-RPC error codes.
#[derive(Debug, Error)]
pub enum FileServiceError {
    #[error(transparent)]
    Metadata(#[from] nexus_metadata::MetadataError),
    #[error(transparent)]
    Namespace(#[from] nexus_namespace::NamespaceError),
    #[error(transparent)]
    Cas(#[from] nexus_cas::CasError),
    #[error(transparent)]
    Rebac(#[from] nexus_rebac::RebacError),
    #[error(transparent)]
    Versioning(#[from] nexus_versioning::VersioningError),
    #[error("permission denied: {subject} lacks {permission} on {object}")]
    PermissionDenied {
        subject: String,
        permission: String,
        object: String,
    },
    #[error("permission check was indeterminate: {0}")]
    PermissionIndeterminate(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("no storage backend configured for {0}")]
    BackendNotConfigured(String),
}

pub type Result<T> = std::result::Result<T, FileServiceError>;
