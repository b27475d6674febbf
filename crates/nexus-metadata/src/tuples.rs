use chrono::Utc;
use rand::RngCore;

use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::Tuple;

fn new_tuple_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Store {
    /// Creates a tuple and bumps the store revision (§4.5 "Consistency
    /// tokens"). Idempotent in effect: creating the same
    /// (subject,relation,object) edge twice yields two tuple rows (each
    /// with its own `tuple_id`) but the same reachability answer for
    /// `check`, satisfying property 5.
    pub fn create_tuple(&self, mut tuple: Tuple) -> (Tuple, u64) {
        let mut inner = self.inner.write();
        tuple.tuple_id = new_tuple_id();
        tuple.created_at = Utc::now();
        inner.tuples.insert(tuple.tuple_id.clone(), tuple.clone());
        inner.revision += 1;
        (tuple, inner.revision)
    }

    pub fn delete_tuple(&self, tenant_id: &str, tuple_id: &str) -> Result<u64> {
        let mut inner = self.inner.write();
        match inner.tuples.get(tuple_id) {
            Some(t) if t.tenant_id == tenant_id => {
                inner.tuples.remove(tuple_id);
                inner.revision += 1;
                Ok(inner.revision)
            }
            _ => Err(MetadataError::TupleNotFound(tuple_id.to_owned())),
        }
    }

    pub fn get_tuple(&self, tuple_id: &str) -> Option<Tuple> {
        self.inner.read().tuples.get(tuple_id).cloned()
    }

    /// Forward index: tuples on `(object_type, object_id)`, optionally
    /// narrowed to one relation. Expired tuples are filtered out here so
    /// every caller gets the same "ignore expired" behavior for free.
    pub fn tuples_for_object(&self, tenant_id: &str, object_type: &str, object_id: &str, relation: Option<&str>) -> Vec<Tuple> {
        let now = Utc::now();
        self.inner
            .read()
            .tuples
            .values()
            .filter(|t| {
                t.tenant_id == tenant_id
                    && t.object_type == object_type
                    && t.object_id == object_id
                    && relation.map(|r| t.relation == r).unwrap_or(true)
                    && !t.is_expired(now)
            })
            .cloned()
            .collect()
    }

    /// Reverse index: tuples whose subject is `(subject_type, subject_id)`.
    pub fn tuples_for_subject(&self, tenant_id: &str, subject_type: &str, subject_id: &str, relation: Option<&str>) -> Vec<Tuple> {
        let now = Utc::now();
        self.inner
            .read()
            .tuples
            .values()
            .filter(|t| {
                t.tenant_id == tenant_id
                    && t.subject_type == subject_type
                    && t.subject_id == subject_id
                    && relation.map(|r| t.relation == r).unwrap_or(true)
                    && !t.is_expired(now)
            })
            .cloned()
            .collect()
    }

    pub fn list_tuples(&self, tenant_id: &str) -> Vec<Tuple> {
        self.inner.read().tuples.values().filter(|t| t.tenant_id == tenant_id).cloned().collect()
    }

    /// Rewrites every tuple whose `object_id` equals `old_path` (for
    /// `object_type="file"`) to `new_path`, implementing the rename
    /// decision in SPEC_FULL.md "Supplemented detail" #1.
    pub fn rewrite_file_object_ids(&self, tenant_id: &str, old_path: &str, new_path: &str) -> u64 {
        let mut inner = self.inner.write();
        let mut touched = false;
        for tuple in inner.tuples.values_mut() {
            if tuple.tenant_id == tenant_id && tuple.object_type == "file" && tuple.object_id == old_path {
                tuple.object_id = new_path.to_owned();
                touched = true;
            }
            if tuple.tenant_id == tenant_id && tuple.subject_type == "file" && tuple.subject_id == old_path {
                tuple.subject_id = new_path.to_owned();
                touched = true;
            }
        }
        if touched {
            inner.revision += 1;
        }
        inner.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(tenant: &str, subject: &str, relation: &str, object: &str) -> Tuple {
        Tuple {
            tuple_id: String::new(),
            tenant_id: tenant.to_owned(),
            subject_type: "user".to_owned(),
            subject_id: subject.to_owned(),
            relation: relation.to_owned(),
            object_type: "file".to_owned(),
            object_id: object.to_owned(),
            expires_at: None,
            condition: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_bumps_revision() {
        let store = Store::new();
        let (_t, rev1) = store.create_tuple(tuple("t", "alice", "editor", "/doc"));
        let (_t2, rev2) = store.create_tuple(tuple("t", "bob", "editor", "/doc"));
        assert!(rev2 > rev1);
    }

    #[test]
    fn forward_and_reverse_index_agree() {
        let store = Store::new();
        let (created, _) = store.create_tuple(tuple("t", "alice", "editor", "/doc"));
        let forward = store.tuples_for_object("t", "file", "/doc", None);
        let reverse = store.tuples_for_subject("t", "user", "alice", None);
        assert_eq!(forward.len(), 1);
        assert_eq!(reverse.len(), 1);
        assert_eq!(forward[0].tuple_id, created.tuple_id);
    }

    #[test]
    fn delete_then_forward_lookup_empty() {
        let store = Store::new();
        let (created, _) = store.create_tuple(tuple("t", "alice", "editor", "/doc"));
        store.delete_tuple("t", &created.tuple_id).unwrap();
        assert!(store.tuples_for_object("t", "file", "/doc", None).is_empty());
    }
}
