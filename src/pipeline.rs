//! Request pipeline: session, search, scrape, response
//!
//! [`search_and_scrape_with`] is the browser-agnostic core and runs against
//! any [`PageDriver`]. [`WebSearchScraper`] wires it to the process-wide
//! chromium session and renders request-level failures as [`ErrorResponse`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{Instrument, info, info_span, warn};

use crate::budget::{MemorySampler, ProcessTreeSampler, ResourceMonitor};
use crate::config::ScrapeConfig;
use crate::driver::PageDriver;
use crate::error::ScrapeError;
use crate::scrape::ScrapeCoordinator;
use crate::search_engine::{IMAGE_ENGINE_NAME, SearchOrchestrator, search_images};
use crate::session::{SessionManager, TabPool};
use crate::storage::{FsObjectStore, ImagePublisher};
use crate::types::{
    ErrorResponse, ScrapeResult, SearchAndScrapeResponse, SearchRequest, SearchRequestBody,
};

/// Run one request against a driver and tab pool
///
/// `monitor` carries the request's start time and hard deadline. Image mode
/// skips page scraping entirely and never fails for lack of images.
pub async fn search_and_scrape_with<D>(
    driver: &D,
    tabs: &TabPool<D::Handle>,
    config: &ScrapeConfig,
    request: &SearchRequest,
    monitor: &ResourceMonitor,
    publisher: Option<&ImagePublisher>,
) -> Result<SearchAndScrapeResponse, ScrapeError>
where
    D: PageDriver,
{
    let requested = request.result_count();

    if request.want_images() {
        let mut images = search_images(
            driver,
            tabs,
            request.query(),
            requested,
            config.engine_timeout(),
            monitor.deadline(),
        )
        .await;

        if let Some(publisher) = publisher
            && !images.is_empty()
        {
            // Direct source URLs stand in if publishing outlives the request
            let published =
                tokio::time::timeout(monitor.remaining(), publisher.publish_all(&images)).await;
            match published {
                Ok(published) => images = published,
                Err(_) => warn!(
                    images = images.len(),
                    "Image publishing hit the request deadline, returning source URLs"
                ),
            }
        }

        return Ok(SearchAndScrapeResponse {
            query: request.query().to_string(),
            engine: IMAGE_ENGINE_NAME.to_string(),
            results: images.into_iter().map(ScrapeResult::image).collect(),
            total_time: monitor.elapsed().as_secs_f64(),
        });
    }

    let outcome = SearchOrchestrator::from_config(config)
        .search(driver, tabs, request.query(), requested, monitor)
        .await?;

    info!(
        engine = %outcome.engine_label(),
        candidates = outcome.candidates.len(),
        "Search finished"
    );

    let report = ScrapeCoordinator::from_config(config)
        .run(driver, tabs, monitor, &outcome.candidates, requested)
        .await;

    if report.accepted.len() < requested {
        warn!(
            accepted = report.accepted.len(),
            requested,
            early_return = report.early_return,
            "Returning partial results"
        );
    }

    Ok(SearchAndScrapeResponse {
        query: request.query().to_string(),
        engine: outcome.engine_label(),
        results: report.accepted,
        total_time: monitor.elapsed().as_secs_f64(),
    })
}

/// Search-and-scrape entry point backed by the shared browser session
pub struct WebSearchScraper {
    config: ScrapeConfig,
    sessions: &'static SessionManager,
    sampler: Arc<dyn MemorySampler>,
    publisher: Option<ImagePublisher>,
}

impl WebSearchScraper {
    /// Attach to the process-wide session, creating it lazily on first request
    #[must_use]
    pub fn new(config: ScrapeConfig) -> Self {
        let sessions = SessionManager::global(&config);
        let publisher = config
            .storage_dir()
            .map(|dir| ImagePublisher::new(Arc::new(FsObjectStore::new(dir.clone()))));
        Self {
            config,
            sessions,
            sampler: Arc::new(ProcessTreeSampler::new()),
            publisher,
        }
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: ImagePublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Validate a raw body, then run it with the full configured deadline
    pub async fn handle(
        &self,
        body: SearchRequestBody,
    ) -> Result<SearchAndScrapeResponse, ErrorResponse> {
        let started = Instant::now();
        let request = SearchRequest::with_limit(
            body.query,
            body.result_count,
            body.want_images,
            self.config.max_results_limit(),
        )
        .map_err(|e| ErrorResponse::from_error(&e, started.elapsed().as_secs_f64()))?;
        self.search_and_scrape(&request).await
    }

    /// Run a request with the configured request deadline
    pub async fn search_and_scrape(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchAndScrapeResponse, ErrorResponse> {
        self.search_and_scrape_within(request, self.config.request_deadline())
            .await
    }

    /// Run a request that must finish within `remaining`
    pub async fn search_and_scrape_within(
        &self,
        request: &SearchRequest,
        remaining: Duration,
    ) -> Result<SearchAndScrapeResponse, ErrorResponse> {
        let started = Instant::now();
        let monitor = ResourceMonitor::for_request(
            &self.config,
            Arc::clone(&self.sampler),
            started,
            started + remaining.min(self.config.request_deadline()),
        );
        let span = info_span!(
            "search_request",
            request_id = %uuid::Uuid::new_v4(),
            query = %request.query(),
            result_count = request.result_count(),
            want_images = request.want_images()
        );

        async {
            let budget = monitor.sample();
            info!(
                memory_used_mb = budget.memory_used_mb,
                memory_ceiling_mb = budget.memory_ceiling_mb,
                remaining_ms = monitor.remaining().as_millis() as u64,
                "Request started"
            );

            let result = self.run(request, &monitor).await;

            let budget = monitor.sample();
            let total_time = monitor.elapsed().as_secs_f64();
            match &result {
                Ok(response) => info!(
                    engine_used = %response.engine,
                    results_count = response.results.len(),
                    total_time,
                    memory_used_mb = budget.memory_used_mb,
                    "Request completed"
                ),
                Err(e) => warn!(
                    error = %e,
                    error_type = e.kind(),
                    total_time,
                    memory_used_mb = budget.memory_used_mb,
                    "Request failed"
                ),
            }

            result.map_err(|e| ErrorResponse::from_error(&e, total_time))
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &SearchRequest,
        monitor: &ResourceMonitor,
    ) -> Result<SearchAndScrapeResponse, ScrapeError> {
        let lease = self.sessions.acquire().await?;
        let session = lease.session();
        search_and_scrape_with(
            session.driver(),
            session.tabs(),
            &self.config,
            request,
            monitor,
            self.publisher.as_ref(),
        )
        .await
    }

    /// Close the shared browser once in-flight requests finish
    pub async fn shutdown(&self) {
        self.sessions.shutdown().await;
    }
}
