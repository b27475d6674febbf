use crate::store::Store;
use crate::types::{ChangeEvent, ChangeKind, NormalizedPath};

impl Store {
    /// Events with `seq > since`, in ascending order, used by `nexus-watch`
    /// for cursor-based resume. Does not apply retention trimming itself —
    /// that's the watch journal's job, so the metadata store stays a
    /// dumb append-only log.
    pub fn events_since(&self, tenant_id: &str, since: u64) -> Vec<ChangeEvent> {
        self.inner
            .read()
            .events
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.seq > since)
            .cloned()
            .collect()
    }

    pub fn latest_seq(&self) -> u64 {
        self.inner.read().next_seq
    }

    /// Events with `seq > since` across every tenant, in ascending order.
    /// Used by `nexus-watch` to pull new events into its own bounded
    /// retention buffer; per-tenant filtering happens there, not here.
    pub fn events_since_all(&self, since: u64) -> Vec<ChangeEvent> {
        self.inner.read().events.iter().filter(|e| e.seq > since).cloned().collect()
    }

    /// Appends a change event directly, bumping the global sequence
    /// counter. Kept separate from `Store::emit` (used internally by
    /// file/version mutations) so the ReBAC layer can record
    /// `PermChanged` events without reaching into `store::Inner`.
    pub fn record_event(&self, tenant_id: &str, kind: ChangeKind, path: NormalizedPath, old_path: Option<NormalizedPath>, actor: Option<String>) -> ChangeEvent {
        let mut inner = self.inner.write();
        let seq = Store::next_seq(&mut inner);
        let event = ChangeEvent {
            seq,
            tenant_id: tenant_id.to_owned(),
            kind,
            path,
            old_path,
            at: chrono::Utc::now(),
            actor,
        };
        inner.events.push(event.clone());
        event
    }
}
