use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::MountRecord;

impl Store {
    /// Adds a mount. Rejects a new mount whose point is a prefix of, or is
    /// prefixed by, an existing mount in the same tenant (§4.4: "mounts do
    /// not overlap").
    pub fn add_mount(&self, record: MountRecord) -> Result<()> {
        let mut inner = self.inner.write();
        let existing = inner.mounts.entry(record.tenant_id.clone()).or_default();
        for m in existing.iter() {
            if prefixes(m.mount_point.as_str(), record.mount_point.as_str())
                || prefixes(record.mount_point.as_str(), m.mount_point.as_str())
            {
                return Err(MetadataError::MountCollision(record.mount_point.to_string()));
            }
        }
        existing.push(record);
        Ok(())
    }

    pub fn remove_mount(&self, tenant_id: &str, mount_point: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let mounts = inner
            .mounts
            .get_mut(tenant_id)
            .ok_or_else(|| MetadataError::MountNotFound(mount_point.to_owned()))?;
        let before = mounts.len();
        mounts.retain(|m| m.mount_point.as_str() != mount_point);
        if mounts.len() == before {
            return Err(MetadataError::MountNotFound(mount_point.to_owned()));
        }
        Ok(())
    }

    pub fn list_mounts(&self, tenant_id: &str) -> Vec<MountRecord> {
        self.inner.read().mounts.get(tenant_id).cloned().unwrap_or_default()
    }

    /// Resolves `path` to the mount with the longest matching prefix, or
    /// `None` for the implicit default ("/") mount.
    pub fn resolve_mount(&self, tenant_id: &str, path: &str) -> Option<MountRecord> {
        let inner = self.inner.read();
        inner
            .mounts
            .get(tenant_id)?
            .iter()
            .filter(|m| prefixes(m.mount_point.as_str(), path))
            .max_by_key(|m| m.mount_point.as_str().len())
            .cloned()
    }
}

fn prefixes(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(tenant: &str, point: &str) -> MountRecord {
        MountRecord {
            tenant_id: tenant.to_owned(),
            mount_point: crate::path::normalize(point).unwrap(),
            backend_id: "local".to_owned(),
            backend_config_blob: None,
            read_only: false,
        }
    }

    #[test]
    fn longest_prefix_wins() {
        let store = Store::new();
        store.add_mount(mount("t", "/a")).unwrap();
        store.add_mount(mount("t", "/a/b")).unwrap();
        let resolved = store.resolve_mount("t", "/a/b/c.txt").unwrap();
        assert_eq!(resolved.mount_point.as_str(), "/a/b");
    }

    #[test]
    fn overlapping_mounts_rejected() {
        let store = Store::new();
        store.add_mount(mount("t", "/a/b")).unwrap();
        assert!(store.add_mount(mount("t", "/a")).is_err());
        assert!(store.add_mount(mount("t", "/a/b/c")).is_err());
    }
}
