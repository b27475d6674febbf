use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::backend::BlobBackend;
use crate::error::{BlobError, Result};

/// A blob backend backed by a file tree under a configured root directory.
/// Keys are sharded two hex characters deep (`blobs/<first-2-hex>/<key>`) so
/// that a million-object store never puts more than a few thousand files in
/// any one directory. Writes go to a temp file in the same directory first,
/// then are renamed into place, so a reader never observes a partially
/// written blob.
pub struct Local {
    root: PathBuf,
}

impl Local {
    pub fn new(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn shard_dir(&self, key: &str) -> PathBuf {
        let prefix: String = key.chars().take(2).collect();
        self.root.join(if prefix.is_empty() { "_" } else { &prefix })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.shard_dir(key).join(key)
    }
}

#[async_trait]
impl BlobBackend for Local {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let key = key.to_owned();
        let bytes = bytes.to_vec();
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || put_sync(&root, &key, &bytes))
            .await
            .map_err(|e| BlobError::Io(std::io::Error::other(e)))?
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::metadata(self.path_for(key)).await.is_ok())
    }

    async fn stat(&self, key: &str) -> Result<u64> {
        match tokio::fs::metadata(self.path_for(key)).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}

fn put_sync(root: &Path, key: &str, bytes: &[u8]) -> Result<()> {
    let prefix: String = key.chars().take(2).collect();
    let dir = root.join(if prefix.is_empty() { "_" } else { &prefix });
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(key)).map_err(|e| BlobError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Local::new(dir.path()).unwrap();
        backend.put("abcd1234", b"hello").await.unwrap();
        let bytes = backend.get("abcd1234").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Local::new(dir.path()).unwrap();
        let err = backend.get("missing").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }

    #[tokio::test]
    async fn keys_are_sharded_by_two_hex_chars() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Local::new(dir.path()).unwrap();
        backend.put("ab112233", b"x").await.unwrap();
        assert!(dir.path().join("ab").join("ab112233").exists());
    }

    #[tokio::test]
    async fn delete_then_exists_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Local::new(dir.path()).unwrap();
        backend.put("ab112233", b"x").await.unwrap();
        backend.delete("ab112233").await.unwrap();
        assert!(!backend.exists("ab112233").await.unwrap());
    }

    #[tokio::test]
    async fn range_read_slices_the_object() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Local::new(dir.path()).unwrap();
        backend.put("ab112233", b"0123456789").await.unwrap();
        let slice = backend.get_range("ab112233", 2, 5).await.unwrap();
        assert_eq!(slice, b"234");
    }
}
