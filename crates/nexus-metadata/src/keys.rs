use chrono::Utc;
use rand::RngCore;

use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::ApiKeyRecord;

fn new_key_id() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Store {
    pub fn create_key(&self, key_hash: String, is_admin: bool, subject_type: String, subject_id: String, tenant_id: String) -> ApiKeyRecord {
        let mut inner = self.inner.write();
        let record = ApiKeyRecord {
            key_id: new_key_id(),
            key_hash,
            is_admin,
            subject_type,
            subject_id,
            tenant_id,
            created_at: Utc::now(),
            revoked: false,
        };
        inner.keys.insert(record.key_id.clone(), record.clone());
        record
    }

    pub fn get_key(&self, key_id: &str) -> Result<ApiKeyRecord> {
        self.inner.read().keys.get(key_id).cloned().ok_or_else(|| MetadataError::KeyNotFound(key_id.to_owned()))
    }

    /// Looks a key up by its stored hash, for bearer-token resolution on
    /// every RPC call. Unrevoked keys only.
    pub fn find_key_by_hash(&self, key_hash: &str) -> Option<ApiKeyRecord> {
        self.inner
            .read()
            .keys
            .values()
            .find(|k| k.key_hash == key_hash && !k.revoked)
            .cloned()
    }

    pub fn list_keys(&self, tenant_id: &str) -> Vec<ApiKeyRecord> {
        self.inner.read().keys.values().filter(|k| k.tenant_id == tenant_id).cloned().collect()
    }

    fn live_admin_count(inner: &crate::store::Inner) -> usize {
        inner.keys.values().filter(|k| k.is_admin && !k.revoked).count()
    }

    /// Whether any unrevoked admin key exists across all tenants, for the
    /// server's `API_KEY` bootstrap: seeding is skipped once this is true so
    /// restarts don't mint a fresh bootstrap key on top of an operator's own.
    pub fn any_admin_key_exists(&self) -> bool {
        Self::live_admin_count(&self.inner.read()) > 0
    }

    /// Revokes a key, refusing if doing so would leave zero unrevoked admin
    /// keys (§4.9: the bootstrap admin can never be fully locked out).
    pub fn revoke_key(&self, key_id: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let is_last_admin = {
            let key = inner.keys.get(key_id).ok_or_else(|| MetadataError::KeyNotFound(key_id.to_owned()))?;
            key.is_admin && !key.revoked && Self::live_admin_count(&inner) <= 1
        };
        if is_last_admin {
            return Err(MetadataError::LastAdmin);
        }
        let key = inner.keys.get_mut(key_id).ok_or_else(|| MetadataError::KeyNotFound(key_id.to_owned()))?;
        key.revoked = true;
        Ok(())
    }

    /// Demotes an admin key to non-admin, subject to the same last-admin
    /// guard as revocation.
    pub fn demote_key(&self, key_id: &str) -> Result<()> {
        self.set_key_admin(key_id, false)
    }

    /// Sets a key's `is_admin` flag. Promoting is unguarded; demoting is
    /// subject to the same last-admin rule as `revoke_key`. Backs
    /// `admin_update_key`.
    pub fn set_key_admin(&self, key_id: &str, is_admin: bool) -> Result<()> {
        let mut inner = self.inner.write();
        let would_strand = {
            let key = inner.keys.get(key_id).ok_or_else(|| MetadataError::KeyNotFound(key_id.to_owned()))?;
            !is_admin && key.is_admin && !key.revoked && Self::live_admin_count(&inner) <= 1
        };
        if would_strand {
            return Err(MetadataError::LastAdmin);
        }
        let key = inner.keys.get_mut(key_id).ok_or_else(|| MetadataError::KeyNotFound(key_id.to_owned()))?;
        key.is_admin = is_admin;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_admin_cannot_be_revoked() {
        let store = Store::new();
        let admin = store.create_key("h1".into(), true, "user".into(), "root".into(), "t".into());
        assert!(matches!(store.revoke_key(&admin.key_id), Err(MetadataError::LastAdmin)));
    }

    #[test]
    fn second_admin_allows_first_to_be_revoked() {
        let store = Store::new();
        let a1 = store.create_key("h1".into(), true, "user".into(), "a".into(), "t".into());
        store.create_key("h2".into(), true, "user".into(), "b".into(), "t".into());
        assert!(store.revoke_key(&a1.key_id).is_ok());
    }

    #[test]
    fn find_by_hash_skips_revoked() {
        let store = Store::new();
        let a1 = store.create_key("h1".into(), true, "user".into(), "a".into(), "t".into());
        store.create_key("h2".into(), true, "user".into(), "b".into(), "t".into());
        store.revoke_key(&a1.key_id).unwrap();
        assert!(store.find_key_by_hash("h1").is_none());
        assert!(store.find_key_by_hash("h2").is_some());
    }
}
