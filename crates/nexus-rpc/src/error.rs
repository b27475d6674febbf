use nexus_cas::CasError;
use nexus_fileservice::FileServiceError;
use nexus_metadata::MetadataError;
use nexus_namespace::NamespaceError;
use nexus_rebac::RebacError;
use nexus_versioning::VersioningError;
use nexus_watch::WatchError;
use thiserror::Error;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const FILE_NOT_FOUND: i64 = -32000;
pub const FILE_EXISTS: i64 = -32001;
pub const INVALID_PATH: i64 = -32002;
pub const ACCESS_DENIED: i64 = -32003;
pub const PERMISSION_ERROR: i64 = -32004;
pub const VALIDATION_ERROR: i64 = -32005;
pub const CONFLICT: i64 = -32006;

/// Unifies every upstream crate's error type under the bit-exact JSON-RPC
/// error codes of §6. Each `#[from]` variant keeps its source's own message;
/// `code()` is the only place that knows the wire-level numbering.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("authentication required")]
    AccessDenied,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("permission check was indeterminate: {0}")]
    PermissionIndeterminate(String),
    #[error(transparent)]
    FileService(#[from] FileServiceError),
    #[error(transparent)]
    Rebac(#[from] RebacError),
    #[error(transparent)]
    Versioning(#[from] VersioningError),
    #[error(transparent)]
    Namespace(#[from] NamespaceError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Cas(#[from] CasError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::Parse(_) => PARSE_ERROR,
            RpcError::InvalidRequest(_) => INVALID_REQUEST,
            RpcError::MethodNotFound(_) => METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => INVALID_PARAMS,
            RpcError::Validation(_) => VALIDATION_ERROR,
            RpcError::AccessDenied => ACCESS_DENIED,
            RpcError::PermissionDenied(_) | RpcError::PermissionIndeterminate(_) => PERMISSION_ERROR,
            RpcError::Internal(_) => INTERNAL_ERROR,
            RpcError::FileService(e) => file_service_code(e),
            RpcError::Rebac(e) => rebac_code(e),
            RpcError::Versioning(e) => versioning_code(e),
            RpcError::Namespace(e) => namespace_code(e),
            RpcError::Metadata(e) => metadata_code(e),
            RpcError::Cas(e) => cas_code(e),
            RpcError::Watch(e) => watch_code(e),
        }
    }
}

fn metadata_code(e: &MetadataError) -> i64 {
    match e {
        MetadataError::FileNotFound(_) => FILE_NOT_FOUND,
        MetadataError::FileExists(_) => FILE_EXISTS,
        MetadataError::DirNotEmpty(_) => CONFLICT,
        MetadataError::VersionNotFound { .. } => FILE_NOT_FOUND,
        MetadataError::PreconditionFailed { .. } => CONFLICT,
        MetadataError::BlobNotFound(_) => INTERNAL_ERROR,
        MetadataError::BlobIntegrity { .. } => INTERNAL_ERROR,
        MetadataError::MountNotFound(_) => FILE_NOT_FOUND,
        MetadataError::MountCollision(_) => CONFLICT,
        MetadataError::WorkspaceNotFound(_) => FILE_NOT_FOUND,
        MetadataError::WorkspaceExists(_) => FILE_EXISTS,
        MetadataError::SnapshotNotFound { .. } => FILE_NOT_FOUND,
        MetadataError::TupleNotFound(_) => FILE_NOT_FOUND,
        MetadataError::KeyNotFound(_) => FILE_NOT_FOUND,
        MetadataError::LastAdmin => PERMISSION_ERROR,
        MetadataError::InvalidPath(_) => INVALID_PATH,
        MetadataError::Validation(_) => VALIDATION_ERROR,
    }
}

fn cas_code(e: &CasError) -> i64 {
    match e {
        CasError::NotFound(_) => FILE_NOT_FOUND,
        CasError::Integrity { .. } | CasError::CorruptManifest(_, _) => INTERNAL_ERROR,
        CasError::Blob(_) => INTERNAL_ERROR,
        CasError::Metadata(inner) => metadata_code(inner),
    }
}

fn rebac_code(e: &RebacError) -> i64 {
    match e {
        RebacError::NamespaceNotFound(_) | RebacError::UndefinedRelation { .. } | RebacError::NamespaceExists(_) => VALIDATION_ERROR,
        RebacError::Indeterminate(_) => PERMISSION_ERROR,
        RebacError::CrossTenant(_) => VALIDATION_ERROR,
        RebacError::Metadata(inner) => metadata_code(inner),
    }
}

fn namespace_code(e: &NamespaceError) -> i64 {
    match e {
        NamespaceError::ReadOnlyMount(_) => PERMISSION_ERROR,
        NamespaceError::Metadata(inner) => metadata_code(inner),
    }
}

fn versioning_code(e: &VersioningError) -> i64 {
    match e {
        VersioningError::Metadata(inner) => metadata_code(inner),
        VersioningError::Cas(inner) => cas_code(inner),
    }
}

fn watch_code(e: &WatchError) -> i64 {
    match e {
        WatchError::InvalidPattern(_) => VALIDATION_ERROR,
        WatchError::JournalFull => CONFLICT,
        WatchError::UnknownSubscription(_) => FILE_NOT_FOUND,
        WatchError::CursorExpired { .. } => CONFLICT,
    }
}

fn file_service_code(e: &FileServiceError) -> i64 {
    match e {
        FileServiceError::Metadata(inner) => metadata_code(inner),
        FileServiceError::Namespace(inner) => namespace_code(inner),
        FileServiceError::Cas(inner) => cas_code(inner),
        FileServiceError::Rebac(inner) => rebac_code(inner),
        FileServiceError::Versioning(inner) => versioning_code(inner),
        FileServiceError::PermissionDenied { .. } => PERMISSION_ERROR,
        FileServiceError::PermissionIndeterminate(_) => PERMISSION_ERROR,
        FileServiceError::InvalidPath(_) => INVALID_PATH,
        FileServiceError::InvalidPattern(_) => VALIDATION_ERROR,
        FileServiceError::BackendNotConfigured(_) => INTERNAL_ERROR,
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_exact_codes_match_the_jsonrpc_contract() {
        assert_eq!(RpcError::Parse("x".into()).code(), -32700);
        assert_eq!(RpcError::InvalidRequest("x".into()).code(), -32600);
        assert_eq!(RpcError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(RpcError::InvalidParams("x".into()).code(), -32602);
        assert_eq!(RpcError::Validation("x".into()).code(), -32005);
        assert_eq!(RpcError::Internal("x".into()).code(), -32603);
        assert_eq!(RpcError::AccessDenied.code(), -32003);
        assert_eq!(RpcError::PermissionDenied("x".into()).code(), -32004);
        assert_eq!(RpcError::PermissionIndeterminate("x".into()).code(), -32004);
    }

    #[test]
    fn metadata_last_admin_maps_to_permission_error() {
        let err = RpcError::from(MetadataError::LastAdmin);
        assert_eq!(err.code(), PERMISSION_ERROR);
    }

    #[test]
    fn watch_journal_full_maps_to_conflict() {
        let err = RpcError::from(WatchError::JournalFull);
        assert_eq!(err.code(), CONFLICT);
    }

    #[test]
    fn nested_file_service_errors_delegate_to_the_wrapped_crates_mapping() {
        let err = RpcError::from(FileServiceError::from(MetadataError::FileNotFound("/a".into())));
        assert_eq!(err.code(), FILE_NOT_FOUND);
    }

    #[test]
    fn cas_not_found_maps_to_file_not_found() {
        let err = RpcError::from(CasError::NotFound(nexus_hash::Digest::of(b"x")));
        assert_eq!(err.code(), FILE_NOT_FOUND);
    }

    #[test]
    fn rebac_indeterminate_maps_to_permission_error() {
        let err = RpcError::from(RebacError::Indeterminate("budget exceeded"));
        assert_eq!(err.code(), PERMISSION_ERROR);
    }
}
