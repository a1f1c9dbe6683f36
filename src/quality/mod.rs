//! Content quality filter
//!
//! Turns one page snapshot into an accepted [`ScrapeResult`] or a rejection
//! reason. No side effects beyond logging.

pub mod clean;

use std::fmt;

use log::debug;

pub use clean::{clean_text, is_readable, word_count};

use crate::config::ScrapeConfig;
use crate::driver::PageSnapshot;
use crate::types::ScrapeResult;
use crate::utils::{BlockedDomains, DEFAULT_MIN_WORD_COUNT};

/// Title fragments that mark an error page served with a 200
const ERROR_TITLE_MARKERS: &[&str] = &["403", "Forbidden", "404", "Not Found"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    BlockedDomain(String),
    HttpError(u16),
    ErrorTitle(String),
    EmptyContent,
    TooFewWords { count: usize, min: usize },
    Unreadable,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::BlockedDomain(host) => write!(f, "blocked domain: {host}"),
            RejectReason::HttpError(status) => write!(f, "HTTP error: {status}"),
            RejectReason::ErrorTitle(title) => write!(f, "error page title: {title}"),
            RejectReason::EmptyContent => write!(f, "empty content"),
            RejectReason::TooFewWords { count, min } => {
                write!(f, "too few words: {count} < {min}")
            }
            RejectReason::Unreadable => write!(f, "content is not readable text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(ScrapeResult),
    Rejected(RejectReason),
}

impl Verdict {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }
}

#[derive(Debug, Clone)]
pub struct QualityFilter {
    blocked: BlockedDomains,
    min_words: usize,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self::new(BlockedDomains::default(), DEFAULT_MIN_WORD_COUNT)
    }
}

impl QualityFilter {
    #[must_use]
    pub fn new(blocked: BlockedDomains, min_words: usize) -> Self {
        Self { blocked, min_words }
    }

    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(config.blocked_domain_set(), config.min_word_count())
    }

    #[must_use]
    pub fn min_words(&self) -> usize {
        self.min_words
    }

    fn blocked_host(&self, url: &str) -> Option<String> {
        if !self.blocked.is_blocked_url(url) {
            return None;
        }
        Some(crate::utils::extract_host(url).unwrap_or_else(|| url.to_string()))
    }

    /// Judge a scraped page
    ///
    /// `url` is the candidate URL the page was loaded from; the snapshot's
    /// final URL is checked against the blocked set as well, so a redirect
    /// onto a blocked host is still rejected. `fallback_title` is the search
    /// result title, used when the page has none.
    #[must_use]
    pub fn evaluate(&self, url: &str, fallback_title: &str, snapshot: &PageSnapshot) -> Verdict {
        let verdict = self.judge(url, fallback_title, snapshot);
        match &verdict {
            Verdict::Accepted(result) => debug!("Accepted {} ({} words)", url, result.word_count),
            Verdict::Rejected(reason) => debug!("Rejected {}: {}", url, reason),
        }
        verdict
    }

    fn judge(&self, url: &str, fallback_title: &str, snapshot: &PageSnapshot) -> Verdict {
        if let Some(host) = self
            .blocked_host(url)
            .or_else(|| self.blocked_host(&snapshot.url))
        {
            return Verdict::Rejected(RejectReason::BlockedDomain(host));
        }

        if let Some(status) = snapshot.http_status.filter(|_| snapshot.is_http_error()) {
            return Verdict::Rejected(RejectReason::HttpError(status));
        }

        if ERROR_TITLE_MARKERS
            .iter()
            .any(|marker| snapshot.title.contains(marker))
        {
            return Verdict::Rejected(RejectReason::ErrorTitle(snapshot.title.clone()));
        }

        let content = clean_text(&snapshot.text);
        if content.is_empty() {
            return Verdict::Rejected(RejectReason::EmptyContent);
        }

        let count = word_count(&content);
        if count < self.min_words {
            return Verdict::Rejected(RejectReason::TooFewWords {
                count,
                min: self.min_words,
            });
        }

        if !is_readable(&content) {
            return Verdict::Rejected(RejectReason::Unreadable);
        }

        let title = match snapshot.title.trim() {
            "" => fallback_title.trim().to_string(),
            title => title.to_string(),
        };

        Verdict::Accepted(ScrapeResult {
            url: url.to_string(),
            title,
            content,
            word_count: count,
            success: true,
            error: None,
            images: snapshot.images.clone(),
        })
    }
}
