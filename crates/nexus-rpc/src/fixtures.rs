//! In-memory `AppState` construction for tests, mirroring the fixture
//! `nexus-fileservice`'s own test module builds around `nexus_blob::Memory`.
#![cfg(test)]

use std::collections::HashMap;
use std::sync::Arc;

use nexus_blob::Memory;
use nexus_cas::CasStore;
use nexus_fileservice::FileService;
use nexus_metadata::Store as MetadataStore;
use nexus_namespace::Router as NamespaceRouter;
use nexus_rebac::{Engine as RebacEngine, NamespaceRegistry};
use nexus_versioning::Versioning;
use nexus_watch::Journal;

use crate::state::AppState;

pub fn test_state() -> AppState {
    let metadata = Arc::new(MetadataStore::new());
    let namespace_router = Arc::new(NamespaceRouter::new(metadata.clone()));
    let namespaces = Arc::new(NamespaceRegistry::new());
    let rebac = RebacEngine::new(metadata.clone(), namespaces);
    let cas = Arc::new(CasStore::new(Arc::new(Memory::new()), metadata.clone(), "cas"));
    let versioning = Arc::new(Versioning::new(metadata.clone(), cas.clone()));
    let mut backends = HashMap::new();
    backends.insert("cas".to_owned(), cas);
    let file_service = Arc::new(FileService::new(metadata.clone(), namespace_router, rebac.clone(), versioning.clone(), backends));
    let journal = Arc::new(Journal::with_defaults(metadata.clone()));

    AppState { file_service, rebac, versioning, metadata, journal }
}

/// Creates a key and returns its plaintext bearer token.
pub fn make_key(state: &AppState, is_admin: bool, subject_type: &str, subject_id: &str, tenant_id: &str) -> String {
    let token = format!("test-token-{subject_type}-{subject_id}");
    let hash = nexus_hash::Digest::of(token.as_bytes()).to_hex();
    state.metadata.create_key(hash, is_admin, subject_type.to_owned(), subject_id.to_owned(), tenant_id.to_owned());
    token
}
