use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::{NormalizedPath, VersionRecord};

impl Store {
    pub fn get_version(&self, tenant_id: &str, path: &NormalizedPath, version: u64) -> Result<VersionRecord> {
        let inner = self.inner.read();
        inner
            .versions
            .get(&(tenant_id.to_owned(), path.clone()))
            .and_then(|vs| vs.iter().find(|v| v.version == version))
            .cloned()
            .ok_or_else(|| MetadataError::VersionNotFound {
                path: path.to_string(),
                version,
            })
    }

    /// All versions of `path`, ordered 1..N (property 1: version
    /// monotonicity, no gaps).
    pub fn list_versions(&self, tenant_id: &str, path: &NormalizedPath) -> Vec<VersionRecord> {
        self.inner
            .read()
            .versions
            .get(&(tenant_id.to_owned(), path.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// `current_version -> Digest` map for every live version row at the
    /// path, used by workspace snapshot/diff.
    pub fn current_version_map(&self, tenant_id: &str, paths: &[NormalizedPath]) -> Vec<(NormalizedPath, u64)> {
        let inner = self.inner.read();
        paths
            .iter()
            .filter_map(|p| {
                inner
                    .files
                    .get(&(tenant_id.to_owned(), p.clone()))
                    .filter(|f| !f.deleted && !f.is_directory)
                    .map(|f| (p.clone(), f.current_version))
            })
            .collect()
    }
}
