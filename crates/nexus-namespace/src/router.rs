use std::collections::HashMap;
use std::sync::Arc;

use nexus_metadata::{MountRecord, NormalizedPath, Store as MetadataStore};
use parking_lot::RwLock;

use crate::error::{NamespaceError, Result};

/// The default, implicit mount: every tenant has one even with zero mount
/// records, routing unmounted paths straight to the system CAS (§4.4).
const DEFAULT_BACKEND_ID: &str = "cas";

/// Where a virtual path lives: which backend owns it, the path relative to
/// the mount point (what the backend actually sees), and whether writes are
/// allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub backend_id: String,
    pub mount_point: NormalizedPath,
    pub relative_path: String,
    pub read_only: bool,
}

/// Resolves virtual paths to backends via longest-prefix match against
/// `nexus-metadata`'s mount table, caching resolutions per tenant. The cache
/// is a plain map invalidated wholesale for a tenant on any mount add/remove
/// for that tenant — mount changes are rare, so there's no need for anything
/// finer-grained than "recompute next time".
pub struct Router {
    metadata: Arc<MetadataStore>,
    cache: RwLock<HashMap<(String, NormalizedPath), Resolution>>,
}

impl Router {
    pub fn new(metadata: Arc<MetadataStore>) -> Self {
        Self {
            metadata,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_mount(&self, record: MountRecord) -> Result<()> {
        let tenant_id = record.tenant_id.clone();
        self.metadata.add_mount(record)?;
        self.invalidate_tenant(&tenant_id);
        Ok(())
    }

    pub fn remove_mount(&self, tenant_id: &str, mount_point: &str) -> Result<()> {
        self.metadata.remove_mount(tenant_id, mount_point)?;
        self.invalidate_tenant(tenant_id);
        Ok(())
    }

    pub fn list_mounts(&self, tenant_id: &str) -> Vec<MountRecord> {
        self.metadata.list_mounts(tenant_id)
    }

    fn invalidate_tenant(&self, tenant_id: &str) {
        self.cache.write().retain(|(t, _), _| t != tenant_id);
    }

    pub fn resolve(&self, tenant_id: &str, path: &NormalizedPath) -> Resolution {
        let key = (tenant_id.to_owned(), path.clone());
        if let Some(hit) = self.cache.read().get(&key) {
            return hit.clone();
        }

        let resolution = match self.metadata.resolve_mount(tenant_id, path.as_str()) {
            Some(mount) => {
                let relative = strip_mount_prefix(&mount.mount_point, path);
                Resolution {
                    backend_id: mount.backend_id,
                    mount_point: mount.mount_point,
                    relative_path: relative,
                    read_only: mount.read_only,
                }
            }
            None => Resolution {
                backend_id: DEFAULT_BACKEND_ID.to_owned(),
                mount_point: NormalizedPath::root(),
                relative_path: path.as_str().to_owned(),
                read_only: false,
            },
        };

        self.cache.write().insert(key, resolution.clone());
        resolution
    }

    /// Resolves and rejects the call outright if the target mount is
    /// read-only (§4.4: "reads through a read-only mount fail writes with
    /// `PERMISSION_ERROR`").
    pub fn resolve_for_write(&self, tenant_id: &str, path: &NormalizedPath) -> Result<Resolution> {
        let resolution = self.resolve(tenant_id, path);
        if resolution.read_only {
            return Err(NamespaceError::ReadOnlyMount(resolution.mount_point.to_string()));
        }
        Ok(resolution)
    }
}

fn strip_mount_prefix(mount_point: &NormalizedPath, path: &NormalizedPath) -> String {
    if mount_point.is_root() {
        return path.as_str().to_owned();
    }
    path.as_str()
        .strip_prefix(mount_point.as_str())
        .and_then(|rest| rest.strip_prefix('/').or(Some(rest)))
        .filter(|rest| !rest.is_empty())
        .unwrap_or("")
        .to_owned()
}
