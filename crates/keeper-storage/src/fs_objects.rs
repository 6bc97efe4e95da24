//! Filesystem object store.
//!
//! Each object is one file directly under the root directory, named by its
//! object key. Writes go to a temporary sibling first and are renamed into
//! place, so readers never observe a half-written object.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::{ObjectStore, StorageError};

/// Object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open an object store rooted at `root`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the directory cannot be created.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::Open {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let safe = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !safe {
            return Err(StorageError::InvalidObjectKey {
                key: key.to_owned(),
            });
        }
        Ok(self.root.join(key))
    }
}

#[async_trait::async_trait]
impl ObjectStore for FsObjectStore {
    async fn put_object(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        let staging = self.root.join(format!(".{key}.partial"));
        let write_err = |e: std::io::Error| StorageError::Write {
            entity: "object",
            key: key.to_owned(),
            reason: e.to_string(),
        };
        fs::write(&staging, &bytes).await.map_err(write_err)?;
        fs::rename(&staging, &path).await.map_err(write_err)?;
        tracing::debug!(key, size = bytes.len(), "object stored");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::ObjectNotFound {
                key: key.to_owned(),
            }),
            Err(e) => Err(StorageError::Read {
                entity: "object",
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                entity: "object",
                key: key.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path().join("objects")).await.unwrap();

        store.put_object("abc-123", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get_object("abc-123").await.unwrap(), [1, 2, 3]);

        store.put_object("abc-123", vec![9]).await.unwrap();
        assert_eq!(store.get_object("abc-123").await.unwrap(), [9]);

        store.delete_object("abc-123").await.unwrap();
        store.delete_object("abc-123").await.unwrap();
        assert!(matches!(
            store.get_object("abc-123").await,
            Err(StorageError::ObjectNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).await.unwrap();
        for key in ["", "../escape", "a/b", ".hidden", "a\\b"] {
            assert!(matches!(
                store.put_object(key, vec![0]).await,
                Err(StorageError::InvalidObjectKey { .. })
            ));
        }
    }
}
