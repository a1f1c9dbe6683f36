//! Data structures shared across the search-and-scrape pipeline

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::ScrapeError;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted query length in characters
pub const MAX_QUERY_LENGTH: usize = 500;

/// Default number of results when the caller does not specify one
pub const DEFAULT_RESULT_COUNT: usize = 5;

/// Hard upper bound on requested results
pub const MAX_RESULT_COUNT: usize = 20;

// =============================================================================
// Request
// =============================================================================

/// A validated search request
///
/// Construct with [`SearchRequest::new`]; fields are private so an accepted
/// request can never be mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    query: String,
    result_count: usize,
    want_images: bool,
}

/// Raw, unvalidated request body as received from an entry point
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequestBody {
    pub query: String,
    #[serde(default = "default_result_count", alias = "k")]
    pub result_count: usize,
    #[serde(default, alias = "include_images")]
    pub want_images: bool,
}

fn default_result_count() -> usize {
    DEFAULT_RESULT_COUNT
}

impl SearchRequest {
    /// Validate and build a request against the global result limit
    pub fn new(
        query: impl Into<String>,
        result_count: usize,
        want_images: bool,
    ) -> Result<Self, ScrapeError> {
        Self::with_limit(query, result_count, want_images, MAX_RESULT_COUNT)
    }

    /// Validate and build a request against a configured result limit
    pub fn with_limit(
        query: impl Into<String>,
        result_count: usize,
        want_images: bool,
        max_results: usize,
    ) -> Result<Self, ScrapeError> {
        let query = query.into();
        let trimmed = query.trim();

        if trimmed.is_empty() {
            return Err(ScrapeError::InvalidParameter(
                "Query cannot be empty".to_string(),
            ));
        }

        let length = trimmed.chars().count();
        if length > MAX_QUERY_LENGTH {
            return Err(ScrapeError::InvalidParameter(format!(
                "Query must be 1-{MAX_QUERY_LENGTH} characters, got {length}"
            )));
        }

        let upper = max_results.min(MAX_RESULT_COUNT);
        if result_count < 1 || result_count > upper {
            return Err(ScrapeError::InvalidParameter(format!(
                "result_count must be between 1 and {upper}, got {result_count}"
            )));
        }

        Ok(Self {
            query: trimmed.to_string(),
            result_count,
            want_images,
        })
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn result_count(&self) -> usize {
        self.result_count
    }

    #[must_use]
    pub fn want_images(&self) -> bool {
        self.want_images
    }
}

impl TryFrom<SearchRequestBody> for SearchRequest {
    type Error = ScrapeError;

    fn try_from(body: SearchRequestBody) -> Result<Self, Self::Error> {
        Self::new(body.query, body.result_count, body.want_images)
    }
}

// =============================================================================
// Search candidates and engine attempts
// =============================================================================

/// A URL+title pair produced by a search engine before scraping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: String,
}

impl Candidate {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Outcome classification of one engine attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Ok,
    Blocked,
    Empty,
    Error,
}

/// Record of one engine being tried; never mutated once logged
#[derive(Debug, Clone, Serialize)]
pub struct EngineAttempt {
    pub engine_name: String,
    pub raw_candidates: Vec<Candidate>,
    pub status: AttemptStatus,
    /// Failure detail for blocked/error attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A ranked candidate after cross-engine merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCandidate {
    /// Position in the merged list (0-indexed, first-seen order)
    pub rank: usize,
    pub url: String,
    pub title: String,
    /// Normalized URL used as dedup identity
    pub normalized: String,
    /// Engine that first produced this candidate
    pub engine: String,
}

// =============================================================================
// Scraping
// =============================================================================

/// A unit of scrape work owned by exactly one tab
#[derive(Debug, Clone)]
pub struct ScrapeTask {
    pub url: String,
    pub title: String,
    pub rank: usize,
    /// Absolute time by which this task must complete or be abandoned
    pub deadline: Instant,
}

/// Terminal unit returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub url: String,
    pub title: String,
    pub content: String,
    pub word_count: usize,
    pub success: bool,
    pub error: Option<String>,
    pub images: Vec<String>,
}

impl ScrapeResult {
    /// A failed scrape record carrying the error reason
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            content: String::new(),
            word_count: 0,
            success: false,
            error: Some(error.into()),
            images: Vec::new(),
        }
    }

    /// An image-only result: the URL is the image itself
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            images: vec![url.clone()],
            url,
            title: String::new(),
            content: String::new(),
            word_count: 0,
            success: true,
            error: None,
        }
    }
}

// =============================================================================
// Response
// =============================================================================

/// Successful (possibly partial) response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAndScrapeResponse {
    pub query: String,
    /// Composite of engines whose candidates were used, e.g. `brave+startpage`
    pub engine: String,
    pub results: Vec<ScrapeResult>,
    /// Seconds from request start to response
    pub total_time: f64,
}

/// Structured request-level failure body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub total_time: f64,
}

impl ErrorResponse {
    #[must_use]
    pub fn from_error(error: &ScrapeError, total_time: f64) -> Self {
        Self {
            error: error.to_string(),
            error_type: error.kind().to_string(),
            total_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_body() {
        let body: SearchRequestBody = serde_json::from_str(r#"{"query":"rust"}"#).unwrap();
        let request = SearchRequest::try_from(body).unwrap();
        assert_eq!(request.result_count(), DEFAULT_RESULT_COUNT);
        assert!(!request.want_images());
    }

    #[test]
    fn test_request_accepts_legacy_aliases() {
        let body: SearchRequestBody =
            serde_json::from_str(r#"{"query":"cats","k":3,"include_images":true}"#).unwrap();
        let request = SearchRequest::try_from(body).unwrap();
        assert_eq!(request.result_count(), 3);
        assert!(request.want_images());
    }

    #[test]
    fn test_request_rejects_blank_query() {
        let err = SearchRequest::new("   ", 5, false).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidParameter(_)));
    }

    #[test]
    fn test_request_rejects_long_query() {
        let query = "a".repeat(MAX_QUERY_LENGTH + 1);
        assert!(SearchRequest::new(query, 5, false).is_err());
        let query = "a".repeat(MAX_QUERY_LENGTH);
        assert!(SearchRequest::new(query, 5, false).is_ok());
    }

    #[test]
    fn test_request_count_bounds() {
        assert!(SearchRequest::new("q", 0, false).is_err());
        assert!(SearchRequest::new("q", 21, false).is_err());
        assert!(SearchRequest::new("q", 20, false).is_ok());
        assert!(SearchRequest::with_limit("q", 12, false, 10).is_err());
    }

    #[test]
    fn test_request_trims_query() {
        let request = SearchRequest::new("  hello world ", 1, false).unwrap();
        assert_eq!(request.query(), "hello world");
    }

    #[test]
    fn test_attempt_status_serializes_lowercase() {
        let json = serde_json::to_string(&AttemptStatus::Blocked).unwrap();
        assert_eq!(json, "\"blocked\"");
    }
}
