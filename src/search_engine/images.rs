//! Image search through Bing Images
//!
//! Bing keeps the original image URL in a JSON blob on each result anchor
//! (`a.iusc[m]`); the rendered thumbnails are only used when that is missing.

use std::collections::HashSet;

use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;

use super::fetch_snapshot;
use crate::driver::PageDriver;
use crate::session::TabPool;
use crate::utils::is_valid_url;

pub const BING_IMAGES_URL: &str = "https://www.bing.com/images/search";

/// Engine label reported for image-mode responses
pub const IMAGE_ENGINE_NAME: &str = "bing";

#[derive(Debug, Deserialize)]
struct IuscMeta {
    murl: Option<String>,
    turl: Option<String>,
}

#[must_use]
pub fn image_search_url(query: &str) -> String {
    match Url::parse_with_params(BING_IMAGES_URL, &[("q", query)]) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{BING_IMAGES_URL}?q={}", urlencoding::encode(query)),
    }
}

/// Up to `limit` distinct image URLs from a Bing Images result page
#[must_use]
pub fn parse_bing_images(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut images: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |url: String, images: &mut Vec<String>| {
        if images.len() < limit && is_valid_url(&url) && seen.insert(url.clone()) {
            images.push(url);
        }
    };

    if let Ok(anchors) = Selector::parse("a.iusc") {
        for anchor in document.select(&anchors) {
            let Some(meta) = anchor.value().attr("m") else {
                continue;
            };
            let Ok(meta) = serde_json::from_str::<IuscMeta>(meta) else {
                continue;
            };
            if let Some(url) = meta.murl.or(meta.turl) {
                push(url, &mut images);
            }
        }
    }

    if images.len() < limit
        && let Ok(thumbs) = Selector::parse("img.mimg")
    {
        for img in document.select(&thumbs) {
            let Some(src) = img.value().attr("src") else {
                continue;
            };
            // bing.com/th are Bing-hosted thumbnails, not source images
            if src.contains("bing.com/th") {
                continue;
            }
            push(src.to_string(), &mut images);
        }
    }

    images
}

/// Run an image search and return up to `limit` direct image URLs
///
/// Any failure yields an empty list; image mode never fails the request
/// on its own.
pub async fn search_images<D>(
    driver: &D,
    tabs: &TabPool<D::Handle>,
    query: &str,
    limit: usize,
    timeout: std::time::Duration,
    deadline: Instant,
) -> Vec<String>
where
    D: PageDriver,
{
    let url = image_search_url(query);
    info!(query = %query, limit, "Searching Bing Images");

    match fetch_snapshot(driver, tabs, &url, timeout, deadline).await {
        Ok(snapshot) => {
            let images = parse_bing_images(&snapshot.html, limit);
            if images.is_empty() {
                warn!(query = %query, "No images found");
            } else {
                info!(count = images.len(), "Extracted image URLs");
            }
            images
        }
        Err(e) => {
            warn!(error = %e, "Bing Images search failed");
            Vec::new()
        }
    }
}
