use thiserror::Error;

#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("mount at {0} is read-only")]
    ReadOnlyMount(String),
    #[error(transparent)]
    Metadata(#[from] nexus_metadata::MetadataError),
}

pub type Result<T> = std::result::Result<T, NamespaceError>;
