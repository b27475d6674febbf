use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersioningError {
    #[error(transparent)]
    Metadata(#[from] nexus_metadata::MetadataError),
    #[error(transparent)]
    Cas(#[from] nexus_cas::CasError),
}

pub type Result<T> = std::result::Result<T, VersioningError>;
