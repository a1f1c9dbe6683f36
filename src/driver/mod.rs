//! Page driver adapter
//!
//! The narrow boundary between the pipeline and the browser-automation
//! runtime: open a tab, navigate it, extract a snapshot, close it. Nothing
//! above this module touches chromiumoxide types directly.

pub mod chromium;
pub mod timeout;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;

pub use chromium::ChromiumDriver;
pub use timeout::with_page_timeout;

/// Everything the pipeline reads from a loaded page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Final URL after redirects
    pub url: String,
    pub title: String,
    /// Visible text of the main content region
    pub text: String,
    /// Absolute http(s) image URLs discovered on the page
    pub images: Vec<String>,
    /// Serialized DOM, used for engine result parsing
    pub html: String,
    /// HTTP status of the main document, when the runtime exposes it
    pub http_status: Option<u16>,
}

impl PageSnapshot {
    /// Whether the driver surfaced an HTTP error state for the main document
    #[must_use]
    pub fn is_http_error(&self) -> bool {
        self.http_status.is_some_and(|status| status >= 400)
    }
}

/// Browser-automation operations consumed by the pipeline
///
/// A handle is single-owner while a task runs; clones exist only so the
/// coordinator can close tabs of tasks it abandons.
pub trait PageDriver: Send + Sync {
    /// One browser tab
    type Handle: Clone + Send + Sync + 'static;

    /// Open a tab with the session identity applied
    fn open(&self) -> impl Future<Output = Result<Self::Handle, ScrapeError>> + Send;

    /// Navigate, failing with `NavigationTimeout` or `NavigationError`
    fn navigate(
        &self,
        handle: &Self::Handle,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Extract title, text, images, html and status from the current page
    fn extract(
        &self,
        handle: &Self::Handle,
    ) -> impl Future<Output = Result<PageSnapshot, ScrapeError>> + Send;

    /// Close the tab; closing an already-dead tab is not an error
    fn close(&self, handle: Self::Handle) -> impl Future<Output = Result<(), ScrapeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_detection() {
        let mut snapshot = PageSnapshot::default();
        assert!(!snapshot.is_http_error());
        snapshot.http_status = Some(200);
        assert!(!snapshot.is_http_error());
        snapshot.http_status = Some(403);
        assert!(snapshot.is_http_error());
    }
}
