//! Builder for `ScrapeConfig`
//!
//! Every setter is infallible; range checks happen once in [`ScrapeConfigBuilder::build`]
//! so invalid combinations are reported together with a clear message.

use std::path::PathBuf;
use std::time::Duration;

use super::types::ScrapeConfig;
use crate::error::ScrapeError;
use crate::search_engine::engines::is_known_engine;
use crate::utils::{
    DEFAULT_BLOCKED_DOMAINS, DEFAULT_BUFFER_RATIO, DEFAULT_CANDIDATE_MULTIPLIER,
    DEFAULT_DEADLINE_SAFETY_MARGIN_MS, DEFAULT_EARLY_RETURN_GRACE_MS, DEFAULT_ENGINE_ORDER,
    DEFAULT_MAX_CONCURRENT_TABS, DEFAULT_MEMORY_CEILING_MB, DEFAULT_MIN_BUFFER,
    DEFAULT_MIN_WORD_COUNT, DEFAULT_PAGE_TIMEOUT_MS, DEFAULT_PRESSURE_HARD_RATIO,
    DEFAULT_PRESSURE_SOFT_RATIO, DEFAULT_REQUEST_DEADLINE_SECS, DEFAULT_SAMPLE_INTERVAL_MS,
    DEFAULT_TAB_CEILING, ENGINE_NAVIGATION_TIMEOUT_MS,
};
use crate::types::MAX_RESULT_COUNT;

/// Minimum allowed per-page timeout
const MIN_PAGE_TIMEOUT_MS: u64 = 1_000;

/// Minimum allowed memory ceiling
const MIN_MEMORY_CEILING_MB: u64 = 128;

#[derive(Debug, Clone)]
pub struct ScrapeConfigBuilder {
    config: ScrapeConfig,
}

impl Default for ScrapeConfigBuilder {
    fn default() -> Self {
        Self {
            config: ScrapeConfig {
                max_concurrent_tabs: DEFAULT_MAX_CONCURRENT_TABS,
                tab_ceiling: DEFAULT_TAB_CEILING,
                page_timeout_ms: DEFAULT_PAGE_TIMEOUT_MS,
                engine_timeout_ms: ENGINE_NAVIGATION_TIMEOUT_MS,
                memory_ceiling_mb: DEFAULT_MEMORY_CEILING_MB,
                request_deadline_ms: DEFAULT_REQUEST_DEADLINE_SECS * 1000,
                deadline_safety_margin_ms: DEFAULT_DEADLINE_SAFETY_MARGIN_MS,
                early_return_grace_ms: DEFAULT_EARLY_RETURN_GRACE_MS,
                sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
                pressure_soft_ratio: DEFAULT_PRESSURE_SOFT_RATIO,
                pressure_hard_ratio: DEFAULT_PRESSURE_HARD_RATIO,
                min_word_count: DEFAULT_MIN_WORD_COUNT,
                candidate_multiplier: DEFAULT_CANDIDATE_MULTIPLIER,
                buffer_ratio: DEFAULT_BUFFER_RATIO,
                min_buffer: DEFAULT_MIN_BUFFER,
                max_results_limit: MAX_RESULT_COUNT,
                engine_order: DEFAULT_ENGINE_ORDER.iter().map(|s| (*s).to_string()).collect(),
                blocked_domains: DEFAULT_BLOCKED_DOMAINS
                    .iter()
                    .map(|s| (*s).to_string())
                    .collect(),
                headless: true,
                chrome_path: None,
                storage_dir: None,
                log_level: "info".to_string(),
            },
        }
    }
}

impl ScrapeConfig {
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder {
        ScrapeConfigBuilder::default()
    }

    /// A builder seeded with this configuration, for targeted overrides
    #[must_use]
    pub fn to_builder(&self) -> ScrapeConfigBuilder {
        ScrapeConfigBuilder {
            config: self.clone(),
        }
    }
}

impl ScrapeConfigBuilder {
    #[must_use]
    pub fn max_concurrent_tabs(mut self, tabs: usize) -> Self {
        self.config.max_concurrent_tabs = tabs;
        self
    }

    #[must_use]
    pub fn tab_ceiling(mut self, ceiling: usize) -> Self {
        self.config.tab_ceiling = ceiling;
        self
    }

    #[must_use]
    pub fn page_timeout(mut self, timeout: Duration) -> Self {
        self.config.page_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn engine_timeout(mut self, timeout: Duration) -> Self {
        self.config.engine_timeout_ms = duration_ms(timeout);
        self
    }

    #[must_use]
    pub fn memory_ceiling_mb(mut self, mb: u64) -> Self {
        self.config.memory_ceiling_mb = mb;
        self
    }

    #[must_use]
    pub fn request_deadline(mut self, deadline: Duration) -> Self {
        self.config.request_deadline_ms = duration_ms(deadline);
        self
    }

    #[must_use]
    pub fn deadline_safety_margin(mut self, margin: Duration) -> Self {
        self.config.deadline_safety_margin_ms = duration_ms(margin);
        self
    }

    #[must_use]
    pub fn early_return_grace(mut self, grace: Duration) -> Self {
        self.config.early_return_grace_ms = duration_ms(grace);
        self
    }

    #[must_use]
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.config.sample_interval_ms = duration_ms(interval);
        self
    }

    #[must_use]
    pub fn pressure_ratios(mut self, soft: f64, hard: f64) -> Self {
        self.config.pressure_soft_ratio = soft;
        self.config.pressure_hard_ratio = hard;
        self
    }

    #[must_use]
    pub fn min_word_count(mut self, words: usize) -> Self {
        self.config.min_word_count = words;
        self
    }

    #[must_use]
    pub fn candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.config.candidate_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn buffer(mut self, ratio: f64, minimum: usize) -> Self {
        self.config.buffer_ratio = ratio;
        self.config.min_buffer = minimum;
        self
    }

    #[must_use]
    pub fn max_results_limit(mut self, limit: usize) -> Self {
        self.config.max_results_limit = limit;
        self
    }

    #[must_use]
    pub fn engine_order<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.engine_order = engines
            .into_iter()
            .map(|e| e.into().trim().to_ascii_lowercase())
            .collect();
        self
    }

    /// Replace the blocked-domain set
    #[must_use]
    pub fn blocked_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.blocked_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Extend the blocked-domain set, keeping the defaults
    #[must_use]
    pub fn extra_blocked_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .blocked_domains
            .extend(domains.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<ScrapeConfig, ScrapeError> {
        let c = &self.config;

        if c.max_concurrent_tabs < 1 {
            return Err(invalid(format!(
                "max_concurrent_tabs must be at least 1, got {}",
                c.max_concurrent_tabs
            )));
        }
        if c.tab_ceiling < c.max_concurrent_tabs {
            return Err(invalid(format!(
                "tab_ceiling ({}) must be >= max_concurrent_tabs ({})",
                c.tab_ceiling, c.max_concurrent_tabs
            )));
        }
        if c.page_timeout_ms < MIN_PAGE_TIMEOUT_MS {
            return Err(invalid(format!(
                "page timeout must be at least {MIN_PAGE_TIMEOUT_MS}ms, got {}ms",
                c.page_timeout_ms
            )));
        }
        if c.max_results_limit < 1 || c.max_results_limit > MAX_RESULT_COUNT {
            return Err(invalid(format!(
                "max_results_limit must be between 1 and {MAX_RESULT_COUNT}, got {}",
                c.max_results_limit
            )));
        }
        if c.memory_ceiling_mb < MIN_MEMORY_CEILING_MB {
            return Err(invalid(format!(
                "memory ceiling must be at least {MIN_MEMORY_CEILING_MB}MB, got {}MB",
                c.memory_ceiling_mb
            )));
        }
        if c.deadline_safety_margin_ms >= c.request_deadline_ms {
            return Err(invalid(format!(
                "deadline safety margin ({}ms) must be shorter than the request deadline ({}ms)",
                c.deadline_safety_margin_ms, c.request_deadline_ms
            )));
        }
        if !(0.0 < c.pressure_soft_ratio
            && c.pressure_soft_ratio < c.pressure_hard_ratio
            && c.pressure_hard_ratio <= 1.0)
        {
            return Err(invalid(format!(
                "pressure ratios must satisfy 0 < soft < hard <= 1, got soft={} hard={}",
                c.pressure_soft_ratio, c.pressure_hard_ratio
            )));
        }
        if c.candidate_multiplier < 1 {
            return Err(invalid("candidate_multiplier must be at least 1".to_string()));
        }
        if c.buffer_ratio < 0.0 {
            return Err(invalid(format!(
                "buffer ratio must not be negative, got {}",
                c.buffer_ratio
            )));
        }
        if c.engine_order.is_empty() {
            return Err(invalid("engine order must name at least one engine".to_string()));
        }
        if let Some(unknown) = c.engine_order.iter().find(|e| !is_known_engine(e)) {
            return Err(invalid(format!("unknown search engine '{unknown}'")));
        }

        Ok(self.config)
    }

    /// Produce the configuration without validation (defaults are known-good)
    pub(crate) fn into_config(self) -> ScrapeConfig {
        self.config
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn invalid(message: String) -> ScrapeError {
    ScrapeError::Config(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScrapeConfig::builder().build().unwrap();
        assert_eq!(config.max_concurrent_tabs(), 11);
        assert_eq!(config.page_timeout(), Duration::from_secs(10));
        assert_eq!(config.engine_order()[0], "brave");
    }

    #[test]
    fn test_rejects_zero_tabs() {
        let err = ScrapeConfig::builder().max_concurrent_tabs(0).build().unwrap_err();
        assert!(err.to_string().contains("max_concurrent_tabs"));
    }

    #[test]
    fn test_rejects_short_page_timeout() {
        let err = ScrapeConfig::builder()
            .page_timeout(Duration::from_millis(500))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("page timeout"));
    }

    #[test]
    fn test_rejects_small_memory() {
        assert!(ScrapeConfig::builder().memory_ceiling_mb(64).build().is_err());
    }

    #[test]
    fn test_rejects_unknown_engine() {
        let err = ScrapeConfig::builder()
            .engine_order(["brave", "altavista"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("altavista"));
    }

    #[test]
    fn test_rejects_inverted_pressure_ratios() {
        assert!(ScrapeConfig::builder().pressure_ratios(0.9, 0.5).build().is_err());
    }

    #[test]
    fn test_extra_blocked_domains_keep_defaults() {
        let config = ScrapeConfig::builder()
            .extra_blocked_domains(["example.org"])
            .build()
            .unwrap();
        let blocked = config.blocked_domain_set();
        assert!(blocked.is_blocked_url("https://example.org/page"));
        assert!(blocked.is_blocked_url("https://reddit.com/r/all"));
    }
}
