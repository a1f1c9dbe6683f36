//! Local directory store with `file://` URLs

use std::path::{Component, Path, PathBuf};

use futures::future::BoxFuture;
use url::Url;

use super::ObjectStore;
use crate::error::ScrapeError;

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key under the root, refusing anything that escapes it
    fn path_for(&self, key: &str) -> Result<PathBuf, ScrapeError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(ScrapeError::Storage(format!("invalid object key '{key}'")));
        }
        Ok(self.root.join(relative))
    }

    async fn write(&self, bytes: Vec<u8>, key: &str) -> Result<String, ScrapeError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScrapeError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ScrapeError::Storage(format!("write {}: {e}", path.display())))?;

        let absolute = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        let url = Url::from_file_path(&absolute)
            .map_err(|()| ScrapeError::Storage(format!("no file URL for {}", absolute.display())))?;

        log::debug!("Stored {} bytes at {}", bytes.len(), url);
        Ok(url.to_string())
    }
}

impl ObjectStore for FsObjectStore {
    fn put<'a>(&'a self, bytes: Vec<u8>, key: &'a str) -> BoxFuture<'a, Result<String, ScrapeError>> {
        Box::pin(self.write(bytes, key))
    }
}
