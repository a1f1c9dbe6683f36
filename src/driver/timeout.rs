//! Timeout utilities for page operations
//!
//! Every page load, navigation plus extraction, goes through
//! [`with_page_timeout`] so that a hung page surfaces as a
//! [`ScrapeError::NavigationTimeout`] instead of stalling a tab.

use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

/// Wrap a page operation with an explicit timeout
///
/// # Arguments
/// * `operation` - The async Future to execute with a timeout
/// * `timeout` - Time allowance; a zero allowance fails without polling
/// * `url` - URL the operation targets, for the error message
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    url: &str,
) -> Result<T, ScrapeError>
where
    F: Future<Output = Result<T, ScrapeError>>,
{
    if timeout.is_zero() {
        return Err(ScrapeError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        });
    }

    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::NavigationTimeout {
            url: url.to_string(),
            timeout,
        }),
    }
}
