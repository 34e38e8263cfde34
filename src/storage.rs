use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    fn public_url(&self, key: &str) -> String;
}

/// Disk-backed storage rooted at `media_root`. Objects written here are
/// served by the router under `/media/`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub async fn new(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create media root {}", root.display()))?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        // Keys are generated internally; anything that could escape the root is a bug.
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            anyhow::bail!("invalid storage key: {key}");
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageClient for LocalStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create media subdir for {key}"))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write object {}", path.display()))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete object {}", path.display())),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("/media/{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path()).await.expect("storage");

        storage
            .put_object("product_image/a.jpg", Bytes::from_static(b"jpeg bytes"))
            .await
            .expect("put");
        let on_disk = dir.path().join("product_image/a.jpg");
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"jpeg bytes");

        storage.delete_object("product_image/a.jpg").await.expect("delete");
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn delete_missing_object_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path()).await.expect("storage");
        storage.delete_object("nope/missing.png").await.expect("delete");
    }

    #[tokio::test]
    async fn rejects_traversal_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path()).await.expect("storage");

        for key in ["../escape.jpg", "a/../../b", "", "a//b"] {
            assert!(
                storage.put_object(key, Bytes::from_static(b"x")).await.is_err(),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn public_url_prefixes_media() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path()).await.expect("storage");
        assert_eq!(storage.public_url("product_image/x.png"), "/media/product_image/x.png");
    }
}
