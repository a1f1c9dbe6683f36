//! Memory-pressure admission policy
//!
//! Pure mapping from one memory reading to a concurrency ceiling. History is
//! never consulted, so the ceiling recovers as soon as memory does.

use serde::Serialize;

use crate::config::ScrapeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetPolicy {
    pub max_concurrency: usize,
    pub memory_ceiling_mb: u64,
    pub soft_ratio: f64,
    pub hard_ratio: f64,
}

impl BudgetPolicy {
    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrent_tabs(),
            memory_ceiling_mb: config.memory_ceiling_mb(),
            soft_ratio: config.pressure_soft_ratio(),
            hard_ratio: config.pressure_hard_ratio(),
        }
    }

    /// Fraction of the ceiling currently in use
    #[must_use]
    pub fn usage_ratio(&self, used_mb: u64) -> f64 {
        if self.memory_ceiling_mb == 0 {
            return 1.0;
        }
        used_mb as f64 / self.memory_ceiling_mb as f64
    }

    /// Concurrency ceiling for a memory reading, never below 1
    ///
    /// Below the soft ratio the configured maximum; between soft and hard
    /// half of it rounded down; at or above hard, drain mode with 1.
    #[must_use]
    pub fn recommended_concurrency(&self, used_mb: u64) -> usize {
        let ratio = self.usage_ratio(used_mb);
        let max = self.max_concurrency.max(1);
        if ratio < self.soft_ratio {
            max
        } else if ratio < self.hard_ratio {
            (max / 2).max(1)
        } else {
            1
        }
    }

    /// Whether a reading is at or above the hard ratio
    #[must_use]
    pub fn is_draining(&self, used_mb: u64) -> bool {
        self.usage_ratio(used_mb) >= self.hard_ratio
    }
}
