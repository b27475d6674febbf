use std::sync::Arc;

use nexus_fileservice::FileService;
use nexus_metadata::Store as MetadataStore;
use nexus_rebac::Engine as RebacEngine;
use nexus_versioning::Versioning;
use nexus_watch::Journal;

/// Shared handle every handler and the `AuthContext` extractor reads from.
/// Cheap to clone: every field is already an `Arc` or, for `RebacEngine`, a
/// thin `Arc`-backed handle in its own right.
#[derive(Clone)]
pub struct AppState {
    pub file_service: Arc<FileService>,
    pub rebac: RebacEngine,
    pub versioning: Arc<Versioning>,
    pub metadata: Arc<MetadataStore>,
    pub journal: Arc<Journal>,
}
