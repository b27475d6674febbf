use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{Duration, Utc};
use glob::Pattern;
use nexus_metadata::{ChangeEvent, ChangeKind, Store as MetadataStore};
use parking_lot::RwLock;
use rand::RngCore;

use crate::error::{Result, WatchError};
use crate::types::{PollResult, SubscribeRequest};

const DEFAULT_CAPACITY: usize = 100_000;
const DEFAULT_RETENTION_HOURS: i64 = 24;
const DEFAULT_HEARTBEAT_SECS: i64 = 30;

/// Fraction of `capacity` the buffer is shrunk down to once it overflows.
/// "Shrinks aggressively under pressure" (§5): drop a quarter of the buffer
/// at once rather than evicting one event per admission, so a sustained
/// burst doesn't pay eviction cost on every single ingest.
const SHRINK_NUM: usize = 3;
const SHRINK_DEN: usize = 4;

fn new_subscription_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

struct Subscription {
    tenant_id: String,
    globs: Vec<Pattern>,
    kinds: Option<HashSet<ChangeKind>>,
    cursor: u64,
    last_heartbeat_at: chrono::DateTime<Utc>,
}

impl Subscription {
    fn matches(&self, event: &ChangeEvent) -> bool {
        if event.tenant_id != self.tenant_id {
            return false;
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if self.globs.is_empty() {
            return true;
        }
        self.globs.iter().any(|g| g.matches(event.path.as_str()) || event.old_path.as_ref().is_some_and(|p| g.matches(p.as_str())))
    }
}

struct Inner {
    buffer: VecDeque<ChangeEvent>,
    synced_seq: u64,
    subscriptions: HashMap<String, Subscription>,
}

/// The watch journal (§4.7): a bounded, subscription-filtered view over
/// `nexus-metadata`'s unbounded change-event log. The metadata store never
/// trims; retention and backpressure are this layer's job, kept separate so
/// the metadata store stays a dumb append-only log.
pub struct Journal {
    metadata: Arc<MetadataStore>,
    inner: RwLock<Inner>,
    capacity: usize,
    retention: Duration,
    heartbeat_interval: Duration,
}

impl Journal {
    pub fn new(metadata: Arc<MetadataStore>, capacity: usize, retention: Duration, heartbeat_interval: Duration) -> Self {
        Self {
            metadata,
            inner: RwLock::new(Inner { buffer: VecDeque::new(), synced_seq: 0, subscriptions: HashMap::new() }),
            capacity,
            retention,
            heartbeat_interval,
        }
    }

    pub fn with_defaults(metadata: Arc<MetadataStore>) -> Self {
        Self::new(
            metadata,
            DEFAULT_CAPACITY,
            Duration::hours(DEFAULT_RETENTION_HOURS),
            Duration::seconds(DEFAULT_HEARTBEAT_SECS),
        )
    }

    /// Pulls new events from the metadata store and applies retention/
    /// capacity trimming. Called at the top of every subscribe/poll so the
    /// buffer never needs a background task to stay current.
    fn sync_locked(&self, inner: &mut Inner) {
        for event in self.metadata.events_since_all(inner.synced_seq) {
            inner.synced_seq = event.seq;
            inner.buffer.push_back(event);
        }

        let horizon = Utc::now() - self.retention;
        while inner.buffer.front().is_some_and(|e| e.at < horizon) {
            inner.buffer.pop_front();
        }

        if inner.buffer.len() > self.capacity {
            let target = self.capacity * SHRINK_NUM / SHRINK_DEN;
            while inner.buffer.len() > target {
                inner.buffer.pop_front();
            }
        }
    }

    pub fn subscribe(&self, request: SubscribeRequest) -> Result<String> {
        let globs = request
            .path_globs
            .iter()
            .map(|p| Pattern::new(p).map_err(|e| WatchError::InvalidPattern(e.to_string())))
            .collect::<Result<Vec<_>>>()?;

        let mut inner = self.inner.write();
        self.sync_locked(&mut inner);

        if inner.buffer.len() >= self.capacity {
            return Err(WatchError::JournalFull);
        }

        let cursor = match request.resume_from {
            Some(resume) => {
                if let Some(front) = inner.buffer.front() {
                    if front.seq > resume + 1 {
                        return Err(WatchError::CursorExpired { cursor: resume, oldest: front.seq });
                    }
                }
                resume
            }
            None => inner.synced_seq,
        };

        let id = new_subscription_id();
        inner.subscriptions.insert(
            id.clone(),
            Subscription {
                tenant_id: request.tenant_id,
                globs,
                kinds: request.event_kinds.map(|ks| ks.into_iter().collect()),
                cursor,
                last_heartbeat_at: Utc::now(),
            },
        );
        Ok(id)
    }

    pub fn unsubscribe(&self, subscription_id: &str) -> Result<()> {
        self.inner.write().subscriptions.remove(subscription_id).map(|_| ()).ok_or_else(|| WatchError::UnknownSubscription(subscription_id.to_owned()))
    }

    pub fn poll(&self, subscription_id: &str) -> Result<PollResult> {
        let mut inner = self.inner.write();
        self.sync_locked(&mut inner);

        let sub = inner.subscriptions.get(subscription_id).ok_or_else(|| WatchError::UnknownSubscription(subscription_id.to_owned()))?;
        let cursor_before = sub.cursor;
        let events: Vec<ChangeEvent> = inner.buffer.iter().filter(|e| e.seq > cursor_before && sub.matches(e)).cloned().collect();

        let new_cursor = events.last().map(|e| e.seq).unwrap_or(cursor_before);
        let had_events = !events.is_empty();
        let heartbeat_due = !had_events && Utc::now() - sub.last_heartbeat_at >= self.heartbeat_interval;

        let sub = inner.subscriptions.get_mut(subscription_id).expect("checked above");
        sub.cursor = new_cursor;
        if had_events || heartbeat_due {
            sub.last_heartbeat_at = Utc::now();
        }

        Ok(PollResult { events, cursor: new_cursor, heartbeat_due })
    }

    pub fn latest_seq(&self) -> u64 {
        self.metadata.latest_seq()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_metadata::normalize;

    fn path(s: &str) -> nexus_metadata::NormalizedPath {
        normalize(s).unwrap()
    }

    #[test]
    fn poll_only_reports_events_after_the_cursor() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), DEFAULT_CAPACITY, Duration::hours(24), Duration::seconds(30));

        metadata.record_event("t", ChangeKind::Created, path("/a"), None, None);
        let id = journal.subscribe(SubscribeRequest { tenant_id: "t".to_owned(), ..Default::default() }).unwrap();
        metadata.record_event("t", ChangeKind::Created, path("/b"), None, None);

        let result = journal.poll(&id).unwrap();
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].path.as_str(), "/b");
    }

    #[test]
    fn subscriptions_are_tenant_scoped() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), DEFAULT_CAPACITY, Duration::hours(24), Duration::seconds(30));

        let id = journal.subscribe(SubscribeRequest { tenant_id: "t1".to_owned(), resume_from: Some(0), ..Default::default() }).unwrap();
        metadata.record_event("t1", ChangeKind::Created, path("/a"), None, None);
        metadata.record_event("t2", ChangeKind::Created, path("/a"), None, None);

        let result = journal.poll(&id).unwrap();
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].tenant_id, "t1");
    }

    #[test]
    fn path_glob_filters_events() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), DEFAULT_CAPACITY, Duration::hours(24), Duration::seconds(30));

        let id = journal
            .subscribe(SubscribeRequest { tenant_id: "t".to_owned(), path_globs: vec!["/docs/*".to_owned()], resume_from: Some(0), ..Default::default() })
            .unwrap();
        metadata.record_event("t", ChangeKind::Created, path("/docs/readme.md"), None, None);
        metadata.record_event("t", ChangeKind::Created, path("/src/main.rs"), None, None);

        let result = journal.poll(&id).unwrap();
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].path.as_str(), "/docs/readme.md");
    }

    #[test]
    fn event_kind_filter_admits_only_requested_kinds() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), DEFAULT_CAPACITY, Duration::hours(24), Duration::seconds(30));

        let id = journal
            .subscribe(SubscribeRequest { tenant_id: "t".to_owned(), event_kinds: Some(vec![ChangeKind::Deleted]), resume_from: Some(0), ..Default::default() })
            .unwrap();
        metadata.record_event("t", ChangeKind::Created, path("/a"), None, None);
        metadata.record_event("t", ChangeKind::Deleted, path("/a"), None, None);

        let result = journal.poll(&id).unwrap();
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].kind, ChangeKind::Deleted);
    }

    #[test]
    fn full_buffer_rejects_new_subscribers() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), 2, Duration::hours(24), Duration::seconds(30));

        metadata.record_event("t", ChangeKind::Created, path("/a"), None, None);
        metadata.record_event("t", ChangeKind::Created, path("/b"), None, None);

        let err = journal.subscribe(SubscribeRequest { tenant_id: "t".to_owned(), ..Default::default() }).unwrap_err();
        assert!(matches!(err, WatchError::JournalFull));
    }

    #[test]
    fn expired_cursor_on_resume_is_rejected() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), 2, Duration::hours(24), Duration::seconds(30));

        metadata.record_event("t", ChangeKind::Created, path("/a"), None, None);
        metadata.record_event("t", ChangeKind::Created, path("/b"), None, None);
        metadata.record_event("t", ChangeKind::Created, path("/c"), None, None);

        let err = journal.subscribe(SubscribeRequest { tenant_id: "t".to_owned(), resume_from: Some(0), ..Default::default() }).unwrap_err();
        assert!(matches!(err, WatchError::CursorExpired { .. }));
    }

    #[test]
    fn heartbeat_is_due_once_the_interval_elapses_with_no_events() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), DEFAULT_CAPACITY, Duration::hours(24), Duration::zero());

        let id = journal.subscribe(SubscribeRequest { tenant_id: "t".to_owned(), resume_from: Some(0), ..Default::default() }).unwrap();
        let result = journal.poll(&id).unwrap();
        assert!(result.events.is_empty());
        assert!(result.heartbeat_due);
    }

    #[test]
    fn unsubscribe_removes_the_subscription() {
        let metadata = Arc::new(MetadataStore::new());
        let journal = Journal::new(metadata.clone(), DEFAULT_CAPACITY, Duration::hours(24), Duration::seconds(30));

        let id = journal.subscribe(SubscribeRequest { tenant_id: "t".to_owned(), ..Default::default() }).unwrap();
        journal.unsubscribe(&id).unwrap();
        assert!(matches!(journal.poll(&id).unwrap_err(), WatchError::UnknownSubscription(_)));
    }
}
