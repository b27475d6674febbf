use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum RebacError {
    #[error("namespace config not found for object type: {0}")]
    NamespaceNotFound(String),
    #[error("relation '{relation}' not defined on object type '{object_type}'")]
    UndefinedRelation { object_type: String, relation: String },
    #[error("namespace already exists for object type: {0}")]
    NamespaceExists(String),
    #[error("check exceeded its budget: {0}")]
    Indeterminate(&'static str),
    #[error("tuple crosses tenants without a cross-tenant whitelist: {0}")]
    CrossTenant(String),
    #[error(transparent)]
    Metadata(#[from] nexus_metadata::MetadataError),
}

pub type Result<T> = std::result::Result<T, RebacError>;
