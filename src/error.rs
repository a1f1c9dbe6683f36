//! Error types for search-and-scrape operations
//!
//! Per-URL and per-engine failures are absorbed by the component that hit
//! them; only the request-fatal variants ever reach the caller.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for search-and-scrape operations
pub type ScrapeResultOf<T> = Result<T, ScrapeError>;

/// Error taxonomy for the pipeline
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    /// Caller input rejected before any browser work begins
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// One engine returned no usable results (triggers fallback)
    #[error("Search engine '{engine}' blocked or returned nothing: {reason}")]
    EngineBlocked { engine: String, reason: String },

    /// Every configured engine was tried and none produced candidates
    #[error("All search engines exhausted: {0}")]
    AllEnginesExhausted(String),

    /// Navigation exceeded its per-page or global time allowance
    #[error("Navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// Navigation failed for a reason other than time
    #[error("Navigation to {url} failed: {reason}")]
    NavigationError { url: String, reason: String },

    /// Memory or deadline pressure forced throttling or early return
    #[error("Resource pressure: {0}")]
    ResourcePressure(String),

    /// Browser process or tab could not be created
    #[error("Browser error: {0}")]
    Browser(String),

    /// Configuration missing or out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Object storage upload failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ScrapeError {
    fn from(error: anyhow::Error) -> Self {
        // {:#} keeps the context chain
        ScrapeError::Other(format!("{error:#}"))
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(error: std::io::Error) -> Self {
        ScrapeError::Other(error.to_string())
    }
}

impl ScrapeError {
    /// Whether this error aborts the whole request
    ///
    /// Per-URL, per-engine and pressure errors are absorbed locally.
    #[must_use]
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::InvalidParameter(_)
                | ScrapeError::AllEnginesExhausted(_)
                | ScrapeError::Browser(_)
                | ScrapeError::Config(_)
        )
    }

    /// Stable machine-readable name, used in the error response body
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InvalidParameter(_) => "InvalidParameter",
            ScrapeError::EngineBlocked { .. } => "EngineBlocked",
            ScrapeError::AllEnginesExhausted(_) => "AllEnginesExhausted",
            ScrapeError::NavigationTimeout { .. } => "NavigationTimeout",
            ScrapeError::NavigationError { .. } => "NavigationError",
            ScrapeError::ResourcePressure(_) => "ResourcePressure",
            ScrapeError::Browser(_) => "BrowserError",
            ScrapeError::Config(_) => "ConfigurationError",
            ScrapeError::Storage(_) => "StorageError",
            ScrapeError::Other(_) => "InternalError",
        }
    }

    /// Build a navigation error from an arbitrary driver failure
    pub fn navigation(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ScrapeError::NavigationError {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ScrapeError::InvalidParameter("k".into()).is_request_fatal());
        assert!(ScrapeError::AllEnginesExhausted("none".into()).is_request_fatal());
        assert!(!ScrapeError::ResourcePressure("mem".into()).is_request_fatal());
        assert!(
            !ScrapeError::NavigationTimeout {
                url: "https://a.com".into(),
                timeout: Duration::from_secs(8),
            }
            .is_request_fatal()
        );
        assert!(
            !ScrapeError::EngineBlocked {
                engine: "brave".into(),
                reason: "captcha".into(),
            }
            .is_request_fatal()
        );
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err = anyhow::anyhow!("root cause").context("launching chrome");
        let converted: ScrapeError = err.into();
        let msg = converted.to_string();
        assert!(msg.contains("launching chrome"));
        assert!(msg.contains("root cause"));
    }

    #[test]
    fn test_display_navigation_timeout() {
        let err = ScrapeError::NavigationTimeout {
            url: "https://example.com".into(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(
            err.to_string(),
            "Navigation to https://example.com timed out after 10s"
        );
    }
}
