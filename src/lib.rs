pub mod budget;
pub mod config;
pub mod driver;
pub mod error;
pub mod identity;
pub mod logging;
pub mod pipeline;
pub mod quality;
pub mod scrape;
pub mod search_engine;
pub mod session;
pub mod storage;
pub mod types;
pub mod utils;

pub use budget::{BudgetPolicy, BudgetState, MemorySampler, ProcessTreeSampler, ResourceMonitor};
pub use config::{ScrapeConfig, ScrapeConfigBuilder};
pub use driver::{ChromiumDriver, PageDriver, PageSnapshot};
pub use error::{ScrapeError, ScrapeResultOf};
pub use identity::Identity;
pub use pipeline::{WebSearchScraper, search_and_scrape_with};
pub use quality::{QualityFilter, RejectReason, Verdict};
pub use scrape::{BatchReport, ScrapeCoordinator};
pub use search_engine::{ResultExtractor, SearchOrchestrator, SearchOutcome};
pub use session::{SessionManager, TabPool};
pub use storage::{FsObjectStore, ImagePublisher, ObjectStore};
pub use types::{
    AttemptStatus, Candidate, EngineAttempt, ErrorResponse, RankedCandidate, ScrapeResult,
    ScrapeTask, SearchAndScrapeResponse, SearchRequest, SearchRequestBody,
};
pub use utils::{BlockedDomains, normalize_url};

/// Run one request on the shared browser session
pub async fn search_and_scrape(
    config: ScrapeConfig,
    request: &SearchRequest,
) -> Result<SearchAndScrapeResponse, ErrorResponse> {
    WebSearchScraper::new(config).search_and_scrape(request).await
}
