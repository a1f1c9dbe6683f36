//! Optional object storage for image results
//!
//! When no store is wired in, image results keep their direct source URLs.

pub mod fs;
pub mod publish;

use futures::future::BoxFuture;

use crate::error::ScrapeError;

pub use fs::FsObjectStore;
pub use publish::{ImagePublisher, object_key};

/// Write-only blob store
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return a URL the caller can hand out
    fn put<'a>(&'a self, bytes: Vec<u8>, key: &'a str) -> BoxFuture<'a, Result<String, ScrapeError>>;
}
