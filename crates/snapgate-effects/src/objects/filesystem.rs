//! Filesystem-backed object store
//!
//! Object keys are slash-separated paths and are mirrored as files under
//! `{base}/objects/`. The content type recorded at upload lives in a
//! parallel tree under `{base}/types/`.

use async_trait::async_trait;
use snapgate_core::effects::{ObjectStoreEffects, ObjectStoreError, StoredObject};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const OBJECTS_DIR: &str = "objects";
const TYPES_DIR: &str = "types";

/// Filesystem object store for single-node deployments
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    base_path: PathBuf,
}

impl FilesystemObjectStore {
    /// Store rooted at `base_path`
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
        if key.is_empty() || key.contains('\\') || key.contains('\0') {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        if key
            .split('/')
            .any(|segment| matches!(segment, "" | "." | ".."))
        {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn path(&self, tree: &str, key: &str) -> PathBuf {
        self.base_path.join(tree).join(key)
    }
}

fn unavailable(action: &str, e: std::io::Error) -> ObjectStoreError {
    ObjectStoreError::Unavailable(format!("Failed to {action}: {e}"))
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), ObjectStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| unavailable("create directory", e))?;
    }
    fs::write(path, contents)
        .await
        .map_err(|e| unavailable("write file", e))
}

async fn remove_if_present(path: &Path) -> Result<(), ObjectStoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(unavailable("remove file", e)),
    }
}

#[async_trait]
impl ObjectStoreEffects for FilesystemObjectStore {
    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        Self::validate_key(key)?;
        write_file(&self.path(OBJECTS_DIR, key), &body).await?;
        let type_path = self.path(TYPES_DIR, key);
        match content_type {
            Some(content_type) => write_file(&type_path, content_type.as_bytes()).await,
            None => remove_if_present(&type_path).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, ObjectStoreError> {
        if Self::validate_key(key).is_err() {
            return Ok(None);
        }
        let body = match fs::read(self.path(OBJECTS_DIR, key)).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable("read object", e)),
        };
        let content_type = match fs::read_to_string(self.path(TYPES_DIR, key)).await {
            Ok(content_type) => Some(content_type),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(unavailable("read content type", e)),
        };
        Ok(Some(StoredObject { body, content_type }))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), ObjectStoreError> {
        for key in keys {
            if Self::validate_key(key).is_err() {
                continue;
            }
            remove_if_present(&self.path(OBJECTS_DIR, key)).await?;
            remove_if_present(&self.path(TYPES_DIR, key)).await?;
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        let root = self.base_path.join(OBJECTS_DIR);
        let mut pending = vec![(root, String::new())];
        let mut keys = Vec::new();

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(unavailable("read directory", e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| unavailable("read directory entry", e))?
            {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let key = format!("{key_prefix}{name}");
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| unavailable("stat entry", e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{key}/")));
                } else if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_bodies_and_content_types() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path().to_path_buf());
        assert!(store.get("snap/a/index.html").await.unwrap().is_none());
        assert!(store.list("snap/").await.unwrap().is_empty());

        store
            .put("snap/a/index.html", b"<p>hi</p>".to_vec(), Some("text/html"))
            .await
            .unwrap();
        store
            .put("snap/a/assets/app.js", b"1".to_vec(), None)
            .await
            .unwrap();
        store.put("snap/b/index.html", vec![], None).await.unwrap();

        let obj = store.get("snap/a/index.html").await.unwrap().unwrap();
        assert_eq!(obj.body, b"<p>hi</p>");
        assert_eq!(obj.content_type.as_deref(), Some("text/html"));
        assert_eq!(
            store.list("snap/a/").await.unwrap(),
            vec![
                "snap/a/assets/app.js".to_string(),
                "snap/a/index.html".to_string()
            ]
        );

        store
            .delete(&["snap/a/index.html".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert!(store.get("snap/a/index.html").await.unwrap().is_none());
        assert_eq!(store.list("snap/").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemObjectStore::new(dir.path().join("store"));
        for key in ["../escape", "snap/../../etc/passwd", "/abs", "a//b", ""] {
            assert!(
                matches!(
                    store.put(key, b"x".to_vec(), None).await,
                    Err(ObjectStoreError::InvalidKey(_))
                ),
                "{key:?}"
            );
            assert!(store.get(key).await.unwrap().is_none());
        }
        assert!(!dir.path().join("escape").exists());
    }
}
