//! Getter methods for `ScrapeConfig`

use std::path::PathBuf;
use std::time::Duration;

use super::types::ScrapeConfig;
use crate::utils::BlockedDomains;

impl ScrapeConfig {
    #[must_use]
    pub fn max_concurrent_tabs(&self) -> usize {
        self.max_concurrent_tabs
    }

    #[must_use]
    pub fn tab_ceiling(&self) -> usize {
        self.tab_ceiling
    }

    #[must_use]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    #[must_use]
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_millis(self.engine_timeout_ms)
    }

    #[must_use]
    pub fn memory_ceiling_mb(&self) -> u64 {
        self.memory_ceiling_mb
    }

    #[must_use]
    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }

    #[must_use]
    pub fn deadline_safety_margin(&self) -> Duration {
        Duration::from_millis(self.deadline_safety_margin_ms)
    }

    #[must_use]
    pub fn early_return_grace(&self) -> Duration {
        Duration::from_millis(self.early_return_grace_ms)
    }

    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    #[must_use]
    pub fn pressure_soft_ratio(&self) -> f64 {
        self.pressure_soft_ratio
    }

    #[must_use]
    pub fn pressure_hard_ratio(&self) -> f64 {
        self.pressure_hard_ratio
    }

    #[must_use]
    pub fn min_word_count(&self) -> usize {
        self.min_word_count
    }

    #[must_use]
    pub fn candidate_multiplier(&self) -> usize {
        self.candidate_multiplier
    }

    #[must_use]
    pub fn buffer_ratio(&self) -> f64 {
        self.buffer_ratio
    }

    #[must_use]
    pub fn min_buffer(&self) -> usize {
        self.min_buffer
    }

    #[must_use]
    pub fn max_results_limit(&self) -> usize {
        self.max_results_limit
    }

    #[must_use]
    pub fn engine_order(&self) -> &[String] {
        &self.engine_order
    }

    #[must_use]
    pub fn blocked_domains(&self) -> &[String] {
        &self.blocked_domains
    }

    /// Compiled matcher over `blocked_domains`
    #[must_use]
    pub fn blocked_domain_set(&self) -> BlockedDomains {
        BlockedDomains::new(&self.blocked_domains)
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn chrome_path(&self) -> Option<&PathBuf> {
        self.chrome_path.as_ref()
    }

    #[must_use]
    pub fn storage_dir(&self) -> Option<&PathBuf> {
        self.storage_dir.as_ref()
    }

    #[must_use]
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}
