//! Admission-controlled parallel scraping
//!
//! # Admission
//! A single loop owns every dispatch decision. Before each admission it takes
//! a fresh [`BudgetState`](crate::budget::BudgetState) and admits only while
//! the in-flight count is below `recommended_concurrency`, so shrinking the
//! budget stops admissions without touching running tasks.
//!
//! # Termination
//! - Enough accepted: once `requested` results are accepted, only in-flight
//!   tasks ranked above the last of them are awaited; the rest are abandoned
//! - Candidates exhausted: every task finished
//! - Early return: pending tasks are dropped, in-flight tasks get a short
//!   grace period, then whatever was accepted is returned
//!
//! Accepted results come back in candidate rank order regardless of
//! completion order.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::future::{AbortHandle, Abortable};
use futures::stream::FuturesUnordered;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::task::{TabSlot, TaskContext, TaskOutcome, run_task};
use crate::budget::ResourceMonitor;
use crate::config::ScrapeConfig;
use crate::driver::PageDriver;
use crate::quality::QualityFilter;
use crate::session::TabPool;
use crate::types::{RankedCandidate, ScrapeResult, ScrapeTask};
use crate::utils::{DEFAULT_EARLY_RETURN_GRACE_MS, DEFAULT_PAGE_TIMEOUT_MS, DEFAULT_SAMPLE_INTERVAL_MS, normalize_url};

/// What one batch produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Accepted results in rank order, at most the requested count
    pub accepted: Vec<ScrapeResult>,
    /// Navigation/extraction failures, for diagnostics
    pub failed: Vec<ScrapeResult>,
    pub admitted: usize,
    pub rejected: usize,
    pub abandoned: usize,
    pub peak_in_flight: usize,
    pub early_return: bool,
}

pub struct ScrapeCoordinator {
    filter: QualityFilter,
    page_timeout: Duration,
    early_return_grace: Duration,
    sample_interval: Duration,
}

impl Default for ScrapeCoordinator {
    fn default() -> Self {
        Self::new(QualityFilter::default())
    }
}

impl ScrapeCoordinator {
    #[must_use]
    pub fn new(filter: QualityFilter) -> Self {
        Self {
            filter,
            page_timeout: Duration::from_millis(DEFAULT_PAGE_TIMEOUT_MS),
            early_return_grace: Duration::from_millis(DEFAULT_EARLY_RETURN_GRACE_MS),
            sample_interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
        }
    }

    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            filter: QualityFilter::from_config(config),
            page_timeout: config.page_timeout(),
            early_return_grace: config.early_return_grace(),
            sample_interval: config.sample_interval(),
        }
    }

    #[must_use]
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_early_return_grace(mut self, grace: Duration) -> Self {
        self.early_return_grace = grace;
        self
    }

    #[must_use]
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn filter(&self) -> &QualityFilter {
        &self.filter
    }

    /// One task per unique normalized URL, in rank order
    fn plan(candidates: &[RankedCandidate], deadline: Instant) -> VecDeque<ScrapeTask> {
        let mut seen = HashSet::new();
        let mut ordered: Vec<&RankedCandidate> = candidates.iter().collect();
        ordered.sort_by_key(|candidate| candidate.rank);

        ordered
            .into_iter()
            .filter(|candidate| {
                let key = if candidate.normalized.is_empty() {
                    normalize_url(&candidate.url)
                } else {
                    candidate.normalized.clone()
                };
                seen.insert(key)
            })
            .map(|candidate| ScrapeTask {
                url: candidate.url.clone(),
                title: candidate.title.clone(),
                rank: candidate.rank,
                deadline,
            })
            .collect()
    }

    /// Scrape candidates until `requested` are accepted or the budget runs out
    pub async fn run<D>(
        &self,
        driver: &D,
        tabs: &TabPool<D::Handle>,
        monitor: &ResourceMonitor,
        candidates: &[RankedCandidate],
        requested: usize,
    ) -> BatchReport
    where
        D: PageDriver,
    {
        let mut report = BatchReport::default();
        if requested == 0 {
            return report;
        }

        let ctx = TaskContext {
            driver,
            tabs,
            filter: &self.filter,
            page_timeout: self.page_timeout,
        };

        let mut pending = Self::plan(candidates, monitor.deadline());
        let mut in_flight = FuturesUnordered::new();
        let mut running: HashMap<usize, (AbortHandle, TabSlot<D::Handle>)> = HashMap::new();
        let mut accepted: BTreeMap<usize, ScrapeResult> = BTreeMap::new();
        let mut grace_deadline: Option<Instant> = None;
        let mut grace_expired = false;
        let mut last_recommended: Option<usize> = None;

        info!(
            candidates = pending.len(),
            requested,
            "Starting scrape batch"
        );

        loop {
            if grace_deadline.is_none() && monitor.should_early_return() {
                let dropped = pending.len();
                pending.clear();
                report.early_return = true;
                let grace = Instant::now() + self.early_return_grace;
                grace_deadline = Some(grace.min(monitor.deadline()));
                warn!(
                    accepted = accepted.len(),
                    in_flight = running.len(),
                    dropped,
                    "Deadline margin reached, returning early"
                );
            }

            // Admission: one fresh budget sample per decision
            while grace_deadline.is_none() && accepted.len() < requested && !pending.is_empty() {
                let state = monitor.sample();
                if state.early_return {
                    break;
                }
                if last_recommended != Some(state.recommended_concurrency) {
                    info!(
                        recommended_concurrency = state.recommended_concurrency,
                        memory_used_mb = state.memory_used_mb,
                        memory_ceiling_mb = state.memory_ceiling_mb,
                        "Concurrency budget changed"
                    );
                    last_recommended = Some(state.recommended_concurrency);
                }
                if running.len() >= state.recommended_concurrency {
                    break;
                }

                let Some(task) = pending.pop_front() else {
                    break;
                };
                let rank = task.rank;
                let slot: TabSlot<D::Handle> = Arc::new(Mutex::new(None));
                let (abort, registration) = AbortHandle::new_pair();
                let future = Abortable::new(run_task(ctx, task, Arc::clone(&slot)), registration);

                debug!(rank, in_flight = running.len() + 1, "Admitting scrape task");
                running.insert(rank, (abort, slot));
                in_flight.push(async move { (rank, future.await) });
                report.admitted += 1;
                report.peak_in_flight = report.peak_in_flight.max(running.len());
            }

            if in_flight.is_empty() {
                break;
            }

            let tick = match grace_deadline {
                Some(grace) => grace,
                None => Instant::now() + self.sample_interval,
            };

            tokio::select! {
                Some((rank, outcome)) = in_flight.next() => {
                    let Some((_, slot)) = running.remove(&rank) else {
                        continue;
                    };
                    match outcome {
                        Ok(TaskOutcome::Accepted(result)) => {
                            debug!(rank, words = result.word_count, "Accepted");
                            accepted.insert(rank, result);
                        }
                        Ok(TaskOutcome::Rejected { url, reason }) => {
                            debug!(rank, url = %url, reason = %reason, "Rejected");
                            report.rejected += 1;
                        }
                        Ok(TaskOutcome::Failed(result)) => {
                            report.failed.push(result);
                        }
                        Err(_aborted) => {
                            report.abandoned += 1;
                            Self::reclaim_tab(driver, tabs, &slot).await;
                        }
                    }
                }
                () = tokio::time::sleep_until(tick), if !grace_expired => {
                    if grace_deadline.is_some_and(|grace| Instant::now() >= grace) {
                        warn!(abandoning = running.len(), "Grace period over");
                        for (abort, _) in running.values() {
                            abort.abort();
                        }
                        grace_expired = true;
                    }
                }
            }

            if accepted.len() >= requested
                && let Some(&cutoff) = accepted.keys().nth(requested - 1)
            {
                for (rank, (abort, _)) in &running {
                    if *rank > cutoff && !abort.is_aborted() {
                        debug!(rank, cutoff, "Abandoning task ranked below the accepted set");
                        abort.abort();
                    }
                }
            }
        }

        report.accepted = accepted.into_values().take(requested).collect();

        info!(
            accepted = report.accepted.len(),
            requested,
            admitted = report.admitted,
            rejected = report.rejected,
            failed = report.failed.len(),
            abandoned = report.abandoned,
            peak_in_flight = report.peak_in_flight,
            early_return = report.early_return,
            "Scrape batch finished"
        );
        report
    }

    /// Recover the tab an abandoned task left parked in its slot
    ///
    /// A tab whose page had finished loading is checked back in; one cut off
    /// mid-navigation is closed.
    async fn reclaim_tab<D>(driver: &D, tabs: &TabPool<D::Handle>, slot: &TabSlot<D::Handle>)
    where
        D: PageDriver,
    {
        let parked = slot.lock().take();
        match parked {
            Some(parked) if parked.loaded => tabs.checkin(parked.handle),
            Some(parked) => {
                let _ = driver.close(parked.handle).await;
                tabs.forget();
            }
            None => {}
        }
    }
}
