use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::types::*;

/// Everything the store guards behind a single lock. Nexus runs one store
/// per process; the committed-state/tx-state split the teacher's in-memory
/// datastore uses buys snapshot isolation across a whole transaction, which
/// Nexus's single-statement metadata operations don't need — each public
/// `Store` method takes the write lock for the span of one logical mutation
/// and releases it, which is enough to give the compare-and-set and
/// atomic-event-emission guarantees §4.1 requires.
#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) files: HashMap<(TenantId, NormalizedPath), FileRecord>,
    pub(crate) versions: HashMap<(TenantId, NormalizedPath), Vec<VersionRecord>>,
    pub(crate) blobs: HashMap<nexus_hash::Digest, BlobRecord>,
    pub(crate) mounts: HashMap<TenantId, Vec<MountRecord>>,
    pub(crate) workspaces: HashMap<(TenantId, NormalizedPath), WorkspaceRecord>,
    pub(crate) snapshots: HashMap<(TenantId, NormalizedPath), Vec<SnapshotRecord>>,
    pub(crate) tuples: HashMap<String, Tuple>,
    pub(crate) entities: HashMap<(String, String), EntityRecord>,
    pub(crate) events: Vec<ChangeEvent>,
    pub(crate) keys: HashMap<String, ApiKeyRecord>,
    pub(crate) next_seq: u64,
    /// Bumped on every tuple-store write; consistency tokens are checked
    /// against this (§4.5 "Consistency tokens").
    pub(crate) revision: u64,
}

/// The metadata store: durable (in this implementation, in-process) records
/// for files, versions, blobs, mounts, workspaces, snapshots, ReBAC tuples,
/// the entity registry, and the change event log (§3, §4.1).
pub struct Store {
    pub(crate) inner: RwLock<Inner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Store {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// The store's current revision: the number of tuple-store writes
    /// committed so far. Used to mint consistency tokens for callers that
    /// want `at_least_as_fresh` checks.
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    pub(crate) fn next_seq(inner: &mut Inner) -> u64 {
        inner.next_seq += 1;
        inner.next_seq
    }

    pub(crate) fn emit(inner: &mut Inner, kind: ChangeKind, tenant_id: &str, path: &NormalizedPath, old_path: Option<NormalizedPath>, actor: Option<String>) {
        let seq = Self::next_seq(inner);
        inner.events.push(ChangeEvent {
            seq,
            tenant_id: tenant_id.to_owned(),
            kind,
            path: path.clone(),
            old_path,
            at: Utc::now(),
            actor,
        });
    }
}
