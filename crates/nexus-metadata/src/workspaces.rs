use chrono::Utc;

use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::{NormalizedPath, WorkspaceRecord};

impl Store {
    pub fn register_workspace(&self, record: WorkspaceRecord) -> Result<()> {
        let mut inner = self.inner.write();
        let key = (record.tenant_id.clone(), record.path.clone());
        if inner.workspaces.contains_key(&key) {
            return Err(MetadataError::WorkspaceExists(record.path.to_string()));
        }
        inner.workspaces.insert(key, record);
        Ok(())
    }

    /// Unregistering a workspace does not delete files (§3 Lifecycle); it
    /// only removes the workspace record itself. Existing snapshots remain
    /// valid and still pin their referenced versions.
    pub fn unregister_workspace(&self, tenant_id: &str, path: &NormalizedPath) -> Result<()> {
        let mut inner = self.inner.write();
        inner
            .workspaces
            .remove(&(tenant_id.to_owned(), path.clone()))
            .map(|_| ())
            .ok_or_else(|| MetadataError::WorkspaceNotFound(path.to_string()))
    }

    pub fn get_workspace(&self, tenant_id: &str, path: &NormalizedPath) -> Result<WorkspaceRecord> {
        self.inner
            .read()
            .workspaces
            .get(&(tenant_id.to_owned(), path.clone()))
            .cloned()
            .ok_or_else(|| MetadataError::WorkspaceNotFound(path.to_string()))
    }

    pub fn list_workspaces(&self, tenant_id: &str) -> Vec<WorkspaceRecord> {
        let mut out: Vec<WorkspaceRecord> = self
            .inner
            .read()
            .workspaces
            .values()
            .filter(|w| w.tenant_id == tenant_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));
        out
    }

    pub fn touch_workspace_ttl(&self, tenant_id: &str, path: &NormalizedPath, ttl_expires_at: Option<chrono::DateTime<Utc>>) -> Result<()> {
        let mut inner = self.inner.write();
        let ws = inner
            .workspaces
            .get_mut(&(tenant_id.to_owned(), path.clone()))
            .ok_or_else(|| MetadataError::WorkspaceNotFound(path.to_string()))?;
        ws.ttl_expires_at = ttl_expires_at;
        Ok(())
    }
}
