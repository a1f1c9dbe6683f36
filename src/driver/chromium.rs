//! chromiumoxide implementation of [`PageDriver`]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use serde::Deserialize;
use tracing::{debug, trace, warn};

use super::{PageDriver, PageSnapshot, with_page_timeout};
use crate::error::ScrapeError;
use crate::identity::{Identity, apply_identity};

/// Upper bound on images reported per page
const MAX_IMAGES_PER_PAGE: usize = 20;

/// Pulls title, main-region text, images and the navigation status in one round trip
const EXTRACT_SCRIPT: &str = r#"
(function() {
    const main = document.querySelector('main')
        || document.querySelector('article')
        || document.body;
    const images = Array.from(document.images || [])
        .map(img => img.currentSrc || img.src || '')
        .filter(src => src.startsWith('http'));
    let status = null;
    try {
        const nav = performance.getEntriesByType('navigation')[0];
        if (nav && nav.responseStatus) { status = nav.responseStatus; }
    } catch (_) {}
    return {
        url: location.href,
        title: document.title || '',
        text: main ? (main.innerText || '') : '',
        images: Array.from(new Set(images)),
        status: status
    };
})()
"#;

#[derive(Debug, Deserialize)]
struct RawExtract {
    url: String,
    title: String,
    text: String,
    #[serde(default)]
    images: Vec<String>,
    status: Option<u16>,
}

/// Drives real tabs of one browser session
///
/// Cloning is cheap; all clones share the browser and the identity.
#[derive(Clone)]
pub struct ChromiumDriver {
    browser: Arc<Browser>,
    identity: Arc<Identity>,
}

impl ChromiumDriver {
    pub fn new(browser: Arc<Browser>, identity: Identity) -> Self {
        Self {
            browser,
            identity: Arc::new(identity),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Give back the shared browser handle
    pub(crate) fn into_browser(self) -> Arc<Browser> {
        self.browser
    }

    /// Cheap liveness probe used by the session health check
    pub async fn is_alive(&self) -> bool {
        self.browser.version().await.is_ok()
    }
}

impl PageDriver for ChromiumDriver {
    type Handle = Page;

    async fn open(&self) -> Result<Page, ScrapeError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to create blank page")
            .map_err(|e| ScrapeError::Browser(format!("{e:#}")))?;

        // Stealth failure degrades fingerprinting but never blocks the tab
        if let Err(e) = apply_identity(&page, &self.identity).await {
            warn!("Failed to apply identity to new tab: {e:#}");
        }

        trace!("Opened tab");
        Ok(page)
    }

    async fn navigate(&self, page: &Page, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "Navigating");
        with_page_timeout(
            async {
                page.goto(url)
                    .await
                    .map(|_| ())
                    .map_err(|e| ScrapeError::navigation(url, e.to_string()))
            },
            timeout,
            url,
        )
        .await
    }

    async fn extract(&self, page: &Page) -> Result<PageSnapshot, ScrapeError> {
        let raw: RawExtract = page
            .evaluate(EXTRACT_SCRIPT)
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to run extraction script: {e}")))?
            .into_value()
            .map_err(|e| ScrapeError::Browser(format!("Failed to decode extraction result: {e}")))?;

        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                trace!("Failed to read page content: {}", e);
                String::new()
            }
        };

        let mut images = raw.images;
        images.truncate(MAX_IMAGES_PER_PAGE);

        Ok(PageSnapshot {
            url: raw.url,
            title: raw.title,
            text: raw.text,
            images,
            html,
            http_status: raw.status,
        })
    }

    async fn close(&self, page: Page) -> Result<(), ScrapeError> {
        if let Err(e) = page.close().await {
            // Tab may already be gone with a crashed renderer
            debug!("Ignoring tab close failure: {}", e);
        }
        Ok(())
    }
}
