use nexus_hash::Digest;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CasError {
    #[error("object not found: {0}")]
    NotFound(Digest),
    #[error("integrity check failed for {expected}: recomputed digest {actual}")]
    Integrity { expected: Digest, actual: Digest },
    #[error("manifest for {0} is corrupt: {1}")]
    CorruptManifest(Digest, String),
    #[error(transparent)]
    Blob(#[from] nexus_blob::BlobError),
    #[error(transparent)]
    Metadata(#[from] nexus_metadata::MetadataError),
}

pub type Result<T> = std::result::Result<T, CasError>;
