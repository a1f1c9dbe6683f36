//! Download image results and republish them through an [`ObjectStore`]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use futures::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use super::ObjectStore;
use crate::error::ScrapeError;

const DEFAULT_KEY_PREFIX: &str = "images";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const MAX_EXTENSION_LEN: usize = 10;

/// `{prefix}/{YYYYmmdd_HHMMSS}_{id}.{ext}`, with the extension taken from
/// the source URL path and defaulting to `jpg`
#[must_use]
pub fn object_key(image_url: &str, prefix: &str) -> String {
    let extension = Url::parse(image_url)
        .ok()
        .and_then(|url| {
            let last = url.path_segments()?.next_back()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            Some(ext.to_string())
        })
        .map(|ext| {
            ext.chars()
                .filter(char::is_ascii_alphanumeric)
                .take(MAX_EXTENSION_LEN)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "jpg".to_string());

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let id = uuid::Uuid::new_v4().simple().to_string();
    let file = sanitize_filename::sanitize(format!("{timestamp}_{}.{extension}", &id[..12]));
    let prefix = sanitize_filename::sanitize(prefix);

    if prefix.is_empty() {
        file
    } else {
        format!("{prefix}/{file}")
    }
}

pub struct ImagePublisher {
    client: Client,
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
    max_retries: u32,
    timeout: Duration,
    max_bytes: usize,
}

impl ImagePublisher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            client: Client::new(),
            store,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    async fn download_once(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header("Accept", "image/avif,image/webp,image/apng,image/*,*/*;q=0.8")
            .send()
            .await
            .context("Failed to download image")?;

        if !response.status().is_success() {
            return Err(anyhow!("Image download failed with status: {}", response.status()));
        }

        if response.content_length().unwrap_or(0) > self.max_bytes as u64 {
            return Err(anyhow!("Image exceeds {} bytes", self.max_bytes));
        }

        let mut buffer = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read image chunk")?;
            if buffer.len() + chunk.len() > self.max_bytes {
                return Err(anyhow!("Image exceeds {} bytes", self.max_bytes));
            }
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer)
    }

    /// Download with exponential backoff: 1s, 2s, 4s...
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_error = None;
        for attempt in 0..self.max_retries {
            match self.download_once(url).await {
                Ok(bytes) => {
                    debug!(url = %url, bytes = bytes.len(), "Downloaded image");
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        "Image download failed: {e:#}"
                    );
                    last_error = Some(e);
                }
            }
            if attempt + 1 < self.max_retries {
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("no download attempts made")))
    }

    /// Fetch one image and store it, returning the stored URL
    pub async fn publish(&self, image_url: &str) -> Result<String, ScrapeError> {
        let bytes = self
            .download(image_url)
            .await
            .map_err(|e| ScrapeError::Storage(format!("{e:#}")))?;
        let key = object_key(image_url, &self.key_prefix);
        self.store.put(bytes, &key).await
    }

    /// Publish every image concurrently; failures keep the source URL
    pub async fn publish_all(&self, image_urls: &[String]) -> Vec<String> {
        let uploads = image_urls.iter().map(|url| async move {
            match self.publish(url).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(url = %url, error = %e, "Keeping direct image URL");
                    url.clone()
                }
            }
        });
        join_all(uploads).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsObjectStore;

    #[test]
    fn test_object_key_shape() {
        let key = object_key("https://cdn.example.com/a/photo.PNG?w=200", "images");
        let (prefix, file) = key.split_once('/').unwrap();
        assert_eq!(prefix, "images");
        assert!(file.ends_with(".png"), "{file}");
        // YYYYmmdd_HHMMSS_ + 12 id chars + .png
        assert_eq!(file.len(), 15 + 1 + 12 + 4);
    }

    #[test]
    fn test_object_key_defaults_extension() {
        assert!(object_key("https://cdn.example.com/image", "").ends_with(".jpg"));
        assert!(object_key("https://cdn.example.com/x.j$p$g$$", "p").ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_publish_all_keeps_source_url_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ImagePublisher::new(Arc::new(FsObjectStore::new(dir.path()))).with_retries(1);
        let urls = vec!["http://127.0.0.1:9/missing.png".to_string()];
        assert_eq!(publisher.publish_all(&urls).await, urls);
    }
}
