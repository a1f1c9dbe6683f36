//! Multi-engine search with fallback
//!
//! Engines are tried in configured order through the page driver. Each one
//! contributes an [`EngineAttempt`](crate::types::EngineAttempt); candidates
//! are merged across attempts until there are enough to survive quality
//! filtering.

pub mod engines;
pub mod extractor;
pub mod images;
pub mod orchestrator;

use std::time::Duration;

use tokio::time::Instant;

use crate::driver::{PageDriver, PageSnapshot, with_page_timeout};
use crate::error::ScrapeError;
use crate::session::TabPool;

pub use engines::{engine_by_name, engines_in_order, is_known_engine};
pub use extractor::{LinkStyle, ResultExtractor, SelectorEngine, detect_block_page};
pub use images::{IMAGE_ENGINE_NAME, parse_bing_images, search_images};
pub use orchestrator::{SearchOrchestrator, SearchOutcome};

/// Load one page on a pooled tab and snapshot it
///
/// Navigation and extraction share one allowance, capped by the time left
/// before `deadline`. The tab goes back to the pool only if both succeeded;
/// a tab that failed or stalled mid-load is closed.
pub(crate) async fn fetch_snapshot<D>(
    driver: &D,
    tabs: &TabPool<D::Handle>,
    url: &str,
    timeout: Duration,
    deadline: Instant,
) -> Result<PageSnapshot, ScrapeError>
where
    D: PageDriver,
{
    let handle = tabs.acquire(driver, deadline).await?;

    let allowance = timeout.min(deadline.saturating_duration_since(Instant::now()));
    let result = with_page_timeout(
        async {
            driver.navigate(&handle, url, allowance).await?;
            driver.extract(&handle).await
        },
        allowance,
        url,
    )
    .await;

    tabs.release(driver, handle, result.is_ok()).await;
    result
}
