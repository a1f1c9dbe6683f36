//! Fallback state machine over the configured engine list

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::engines::engines_in_order;
use super::extractor::ResultExtractor;
use super::fetch_snapshot;
use crate::budget::ResourceMonitor;
use crate::config::ScrapeConfig;
use crate::driver::PageDriver;
use crate::error::ScrapeError;
use crate::session::TabPool;
use crate::types::{AttemptStatus, Candidate, EngineAttempt, RankedCandidate};
use crate::utils::{BlockedDomains, normalize_url};

/// Terminal state of one orchestration run
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Merged, deduplicated candidates in first-seen rank order
    pub candidates: Vec<RankedCandidate>,
    /// Engines tried, in order
    pub engines_used: Vec<String>,
    /// Attempt log, one entry per engine tried
    pub attempts: Vec<EngineAttempt>,
}

impl SearchOutcome {
    /// Composite engine label, e.g. `brave+startpage`
    #[must_use]
    pub fn engine_label(&self) -> String {
        self.engines_used.join("+")
    }
}

pub struct SearchOrchestrator {
    engines: Vec<Arc<dyn ResultExtractor>>,
    blocked: BlockedDomains,
    engine_timeout: Duration,
    buffer_ratio: f64,
    min_buffer: usize,
    candidate_multiplier: usize,
}

impl SearchOrchestrator {
    pub fn new(
        engines: Vec<Arc<dyn ResultExtractor>>,
        blocked: BlockedDomains,
        engine_timeout: Duration,
    ) -> Self {
        Self {
            engines,
            blocked,
            engine_timeout,
            buffer_ratio: crate::utils::DEFAULT_BUFFER_RATIO,
            min_buffer: crate::utils::DEFAULT_MIN_BUFFER,
            candidate_multiplier: crate::utils::DEFAULT_CANDIDATE_MULTIPLIER,
        }
    }

    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            engines: engines_in_order(config.engine_order()),
            blocked: config.blocked_domain_set(),
            engine_timeout: config.engine_timeout(),
            buffer_ratio: config.buffer_ratio(),
            min_buffer: config.min_buffer(),
            candidate_multiplier: config.candidate_multiplier(),
        }
    }

    /// Override the buffer heuristic
    #[must_use]
    pub fn with_buffer(mut self, ratio: f64, min_buffer: usize) -> Self {
        self.buffer_ratio = ratio.max(0.0);
        self.min_buffer = min_buffer;
        self
    }

    #[must_use]
    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = multiplier.max(1);
        self
    }

    /// Candidates needed before fallback stops: `k + max(ceil(k * ratio), min_buffer)`
    #[must_use]
    pub fn required_candidates(&self, requested: usize) -> usize {
        let scaled = (requested as f64 * self.buffer_ratio).ceil() as usize;
        requested + scaled.max(self.min_buffer)
    }

    /// Most candidates ever handed to the scrape coordinator
    #[must_use]
    pub fn candidate_cap(&self, requested: usize) -> usize {
        (requested * self.candidate_multiplier).max(self.required_candidates(requested))
    }

    /// Classify one engine's page and strip blocked hosts
    fn attempt_from_html(&self, engine: &dyn ResultExtractor, html: &str) -> EngineAttempt {
        if let Some(reason) = engine.blocked_reason(html) {
            return EngineAttempt {
                engine_name: engine.name().to_string(),
                raw_candidates: Vec::new(),
                status: AttemptStatus::Blocked,
                detail: Some(reason),
            };
        }

        let raw_candidates: Vec<Candidate> = engine
            .extract_candidates(html)
            .into_iter()
            .filter(|candidate| !self.blocked.is_blocked_url(&candidate.url))
            .collect();

        let (status, detail) = if raw_candidates.is_empty() {
            (AttemptStatus::Empty, Some("no usable results".to_string()))
        } else {
            (AttemptStatus::Ok, None)
        };

        EngineAttempt {
            engine_name: engine.name().to_string(),
            raw_candidates,
            status,
            detail,
        }
    }

    async fn try_engine<D>(
        &self,
        engine: &dyn ResultExtractor,
        driver: &D,
        tabs: &TabPool<D::Handle>,
        query: &str,
        monitor: &ResourceMonitor,
    ) -> EngineAttempt
    where
        D: PageDriver,
    {
        let url = engine.search_url(query);
        debug!(engine = engine.name(), url = %url, "Trying search engine");

        match fetch_snapshot(driver, tabs, &url, self.engine_timeout, monitor.deadline()).await {
            Ok(snapshot) => self.attempt_from_html(engine, &snapshot.html),
            Err(e) => EngineAttempt {
                engine_name: engine.name().to_string(),
                raw_candidates: Vec::new(),
                status: AttemptStatus::Error,
                detail: Some(e.to_string()),
            },
        }
    }

    /// Walk the engine list until enough unique candidates are merged
    ///
    /// Fails with `AllEnginesExhausted` only when no engine produced a
    /// single usable candidate.
    pub async fn search<D>(
        &self,
        driver: &D,
        tabs: &TabPool<D::Handle>,
        query: &str,
        requested: usize,
        monitor: &ResourceMonitor,
    ) -> Result<SearchOutcome, ScrapeError>
    where
        D: PageDriver,
    {
        let needed = self.required_candidates(requested);
        let mut merged: Vec<RankedCandidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut engines_used = Vec::new();
        let mut attempts = Vec::new();

        for engine in &self.engines {
            if monitor.should_early_return() {
                warn!(engine = engine.name(), "Deadline margin reached, not trying more engines");
                break;
            }

            let attempt = self.try_engine(engine.as_ref(), driver, tabs, query, monitor).await;
            engines_used.push(attempt.engine_name.clone());

            match attempt.status {
                AttemptStatus::Ok => {
                    let before = merged.len();
                    for candidate in &attempt.raw_candidates {
                        let normalized = normalize_url(&candidate.url);
                        if seen.insert(normalized.clone()) {
                            merged.push(RankedCandidate {
                                rank: merged.len(),
                                url: candidate.url.clone(),
                                title: candidate.title.clone(),
                                normalized,
                                engine: attempt.engine_name.clone(),
                            });
                        }
                    }
                    info!(
                        engine = %attempt.engine_name,
                        raw = attempt.raw_candidates.len(),
                        added = merged.len() - before,
                        total = merged.len(),
                        needed,
                        "Engine attempt merged"
                    );
                }
                _ => {
                    let blocked = ScrapeError::EngineBlocked {
                        engine: attempt.engine_name.clone(),
                        reason: attempt.detail.clone().unwrap_or_default(),
                    };
                    warn!(status = ?attempt.status, "{}", blocked);
                }
            }

            attempts.push(attempt);

            if merged.len() >= needed {
                break;
            }
        }

        if merged.is_empty() {
            let tried = if engines_used.is_empty() {
                "no engine could be tried".to_string()
            } else {
                format!("tried {}", engines_used.join(", "))
            };
            return Err(ScrapeError::AllEnginesExhausted(tried));
        }

        merged.truncate(self.candidate_cap(requested));

        Ok(SearchOutcome {
            candidates: merged,
            engines_used,
            attempts,
        })
    }
}
