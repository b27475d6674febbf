use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{FutureExt, Shared};
use parking_lot::RwLock;

use crate::types::Entity;

type SubproblemKey = (String, String, String, String, String, String);

#[derive(Clone, Copy)]
struct CachedAnswer {
    allowed: bool,
    revision: u64,
}

/// Cache #1: `(tenant, subject, permission, object, quantized_revision) →
/// allowed`. Quantization rounds wall-clock up to the next `window`
/// boundary so concurrent checks share entries (§4.5 cache 1).
pub struct SubproblemCache {
    entries: RwLock<HashMap<(SubproblemKey, i64), CachedAnswer>>,
    window: Duration,
}

impl SubproblemCache {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            window,
        }
    }

    fn quantize(&self, now: DateTime<Utc>) -> i64 {
        let window_secs = self.window.as_secs().max(1) as i64;
        let epoch = now.timestamp();
        (epoch / window_secs + 1) * window_secs
    }

    fn key(tenant: &str, subject: &Entity, permission: &str, object: &Entity) -> SubproblemKey {
        (
            tenant.to_owned(),
            format!("{}:{}", subject.entity_type, subject.entity_id),
            permission.to_owned(),
            object.entity_type.clone(),
            object.entity_id.clone(),
            String::new(),
        )
    }

    /// Returns a cached answer if one exists for the current time window and
    /// satisfies `min_revision` (the `at_least_as_fresh` floor, or `None` for
    /// `minimize_latency`).
    pub fn get(&self, tenant: &str, subject: &Entity, permission: &str, object: &Entity, now: DateTime<Utc>, min_revision: Option<u64>) -> Option<bool> {
        let bucket = self.quantize(now);
        let key = (Self::key(tenant, subject, permission, object), bucket);
        let entries = self.entries.read();
        let cached = entries.get(&key)?;
        if min_revision.map(|floor| cached.revision < floor).unwrap_or(false) {
            return None;
        }
        Some(cached.allowed)
    }

    pub fn put(&self, tenant: &str, subject: &Entity, permission: &str, object: &Entity, now: DateTime<Utc>, allowed: bool, revision: u64) {
        let bucket = self.quantize(now);
        let key = (Self::key(tenant, subject, permission, object), bucket);
        self.entries.write().insert(key, CachedAnswer { allowed, revision });
    }

    /// Drops every cached entry for `object`, regardless of time bucket —
    /// the "affected frontier" invalidation in §4.5.
    pub fn invalidate_object(&self, tenant: &str, object: &Entity) {
        self.entries
            .write()
            .retain(|(key, _), _| !(key.0 == tenant && key.3 == object.entity_type && key.4 == object.entity_id));
    }
}

type BoxedCheck = Pin<Box<dyn Future<Output = crate::error::Result<crate::types::CheckOutcome>> + Send>>;

/// Cache #3: concurrent identical checks share one computation via a
/// pending-future table (§4.5 cache 3).
#[derive(Default)]
pub struct InFlight {
    pending: StdMutex<HashMap<SubproblemKey, Shared<BoxedCheck>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F>(&self, tenant: &str, subject: &Entity, permission: &str, object: &Entity, fut: F) -> crate::error::Result<crate::types::CheckOutcome>
    where
        F: Future<Output = crate::error::Result<crate::types::CheckOutcome>> + Send + 'static,
    {
        let key = SubproblemCache::key(tenant, subject, permission, object);

        let existing = self.pending.lock().unwrap().get(&key).cloned();
        let shared = match existing {
            Some(shared) => shared,
            None => {
                let shared: Shared<BoxedCheck> = (Box::pin(fut) as BoxedCheck).shared();
                self.pending.lock().unwrap().insert(key.clone(), shared.clone());
                shared
            }
        };

        let result = shared.await;
        self.pending.lock().unwrap().remove(&key);
        result
    }
}

/// Cache #4: for a common `(permission, object)` pair, a precomputed set of
/// authorized subjects served directly instead of walking the graph
/// (§4.5 cache 4). Populated explicitly by `Engine::rebuild_hot_bitmap`;
/// `check` consults it as a fast path before falling back to the walk.
#[derive(Default)]
pub struct HotBitmap {
    sets: RwLock<HashMap<(String, String, String, String), HashSet<(String, String)>>>,
}

impl HotBitmap {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(tenant: &str, permission: &str, object: &Entity) -> (String, String, String, String) {
        (tenant.to_owned(), permission.to_owned(), object.entity_type.clone(), object.entity_id.clone())
    }

    pub fn set(&self, tenant: &str, permission: &str, object: &Entity, subjects: HashSet<(String, String)>) {
        self.sets.write().insert(Self::key(tenant, permission, object), subjects);
    }

    pub fn contains(&self, tenant: &str, permission: &str, object: &Entity, subject: &Entity) -> Option<bool> {
        self.sets
            .read()
            .get(&Self::key(tenant, permission, object))
            .map(|subjects| subjects.contains(&(subject.entity_type.clone(), subject.entity_id.clone())))
    }

    pub fn invalidate(&self, tenant: &str, permission: &str, object: &Entity) {
        self.sets.write().remove(&Self::key(tenant, permission, object));
    }
}

/// Cache #2: `(tenant, subject) → {(group_type, group_id)}`, giving O(1)
/// membership checks for deeply nested groups once a membership has been
/// established by a walk (§4.5 cache 2). Maintained incrementally by the
/// engine whenever it resolves a `member`-style relation.
#[derive(Default)]
pub struct GroupClosureIndex {
    closures: RwLock<HashMap<(String, String, String), HashSet<(String, String)>>>,
}

impl GroupClosureIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(tenant: &str, subject: &Entity) -> (String, String, String) {
        (tenant.to_owned(), subject.entity_type.clone(), subject.entity_id.clone())
    }

    pub fn record(&self, tenant: &str, subject: &Entity, group: &Entity) {
        self.closures
            .write()
            .entry(Self::key(tenant, subject))
            .or_default()
            .insert((group.entity_type.clone(), group.entity_id.clone()));
    }

    pub fn is_member(&self, tenant: &str, subject: &Entity, group: &Entity) -> Option<bool> {
        let closures = self.closures.read();
        let set = closures.get(&Self::key(tenant, subject))?;
        Some(set.contains(&(group.entity_type.clone(), group.entity_id.clone())))
    }

    pub fn invalidate_subject(&self, tenant: &str, subject: &Entity) {
        self.closures.write().remove(&Self::key(tenant, subject));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subproblem_cache_hits_within_window() {
        let cache = SubproblemCache::new(Duration::from_secs(5));
        let now = Utc::now();
        let s = Entity::new("user", "a");
        let o = Entity::new("file", "/x");
        cache.put("t", &s, "read", &o, now, true, 3);
        assert_eq!(cache.get("t", &s, "read", &o, now, None), Some(true));
    }

    #[test]
    fn stale_revision_is_rejected_under_at_least_as_fresh() {
        let cache = SubproblemCache::new(Duration::from_secs(5));
        let now = Utc::now();
        let s = Entity::new("user", "a");
        let o = Entity::new("file", "/x");
        cache.put("t", &s, "read", &o, now, true, 3);
        assert_eq!(cache.get("t", &s, "read", &o, now, Some(5)), None);
        assert_eq!(cache.get("t", &s, "read", &o, now, Some(3)), Some(true));
    }

    #[test]
    fn invalidate_object_drops_all_its_entries() {
        let cache = SubproblemCache::new(Duration::from_secs(5));
        let now = Utc::now();
        let s = Entity::new("user", "a");
        let o = Entity::new("file", "/x");
        cache.put("t", &s, "read", &o, now, true, 1);
        cache.invalidate_object("t", &o);
        assert_eq!(cache.get("t", &s, "read", &o, now, None), None);
    }

    #[test]
    fn group_closure_records_and_reads_membership() {
        let index = GroupClosureIndex::new();
        let subject = Entity::new("user", "bob");
        let group = Entity::new("tenant", "T");
        assert_eq!(index.is_member("t", &subject, &group), None);
        index.record("t", &subject, &group);
        assert_eq!(index.is_member("t", &subject, &group), Some(true));
    }

    #[tokio::test]
    async fn inflight_dedup_shares_one_computation() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let inflight = InFlight::new();
        let calls = Arc::new(AtomicU32::new(0));
        let s = Entity::new("user", "a");
        let o = Entity::new("file", "/x");

        let calls2 = calls.clone();
        let fut = async move {
            calls2.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(crate::types::CheckOutcome {
                decision: crate::types::Decision::Allow,
                reason: None,
                resolved_at: 1,
            })
        };

        let (a, b) = tokio::join!(inflight.run("t", &s, "read", &o, fut), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            inflight
                .run("t", &s, "read", &o, async {
                    unreachable!("second caller should share the first's future, not start its own")
                })
                .await
        });
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
