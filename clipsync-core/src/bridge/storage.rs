use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::bridge::ImageStore;
use crate::error::ClipSyncError;

/// Sub-directory of the pictures folder that received images go to.
pub const IMAGE_DIR_NAME: &str = "ClipSync";

/// Writes each image to `<dir>/clipsync-<uuid>.png`.
#[derive(Debug, Clone)]
pub struct DirectoryImageStore {
    dir: PathBuf,
}

impl DirectoryImageStore {
    /// The directory is created on the first write, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<pictures>/ClipSync`, falling back to the home directory and then
    /// the working directory when the platform has no pictures folder.
    pub fn default_dir() -> PathBuf {
        dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(IMAGE_DIR_NAME)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for DirectoryImageStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

#[async_trait]
impl ImageStore for DirectoryImageStore {
    async fn store(&self, png: &[u8]) -> Result<String, ClipSyncError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ClipSyncError::Storage(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let path = self.dir.join(format!("clipsync-{}.png", Uuid::new_v4()));
        tokio::fs::write(&path, png)
            .await
            .map_err(|e| ClipSyncError::Storage(format!("cannot write {}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), bytes = png.len(), "saved received image");
        Ok(path.display().to_string())
    }
}

/// Keeps images in memory, keyed by `memory-<n>`. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageStore {
    images: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Vec<u8>> {
        self.images.lock().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.images.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(&self, png: &[u8]) -> Result<String, ClipSyncError> {
        let mut images = self
            .images
            .lock()
            .map_err(|_| ClipSyncError::Storage("image store lock poisoned".into()))?;
        let id = format!("memory-{}", images.len() + 1);
        images.insert(id.clone(), png.to_vec());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_store_creates_dir_and_writes_png() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryImageStore::new(tmp.path().join("nested").join(IMAGE_DIR_NAME));

        let id = store.store(b"\x89PNG\r\n\x1a\npayload").await.unwrap();
        let path = PathBuf::from(&id);

        assert!(path.starts_with(store.dir()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("clipsync-"));
        assert!(name.ends_with(".png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG\r\n\x1a\npayload");
    }

    #[tokio::test]
    async fn directory_store_names_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryImageStore::new(tmp.path());
        let a = store.store(b"a").await.unwrap();
        let b = store.store(b"b").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn directory_store_reports_unwritable_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let store = DirectoryImageStore::new(blocker.join("sub"));
        assert!(matches!(store.store(b"x").await, Err(ClipSyncError::Storage(_))));
    }

    #[test]
    fn default_dir_ends_with_app_folder() {
        assert!(DirectoryImageStore::default_dir().ends_with(IMAGE_DIR_NAME));
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryImageStore::new();
        assert!(store.is_empty());
        let id = store.store(&[1, 2, 3]).await.unwrap();
        assert_eq!(id, "memory-1");
        assert_eq!(store.get(&id), Some(vec![1, 2, 3]));
        assert_eq!(store.len(), 1);
    }
}
