//! Core configuration type for search-and-scrape
//!
//! Everything the pipeline consumes from outside lives here: concurrency and
//! tab limits, timeouts, memory ceiling, deadline, blocked domains and the
//! engine fallback order.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct for search-and-scrape operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Concurrent tabs when memory is below the soft pressure ratio
    pub(crate) max_concurrent_tabs: usize,

    /// Hard ceiling on live tabs in the session, idle ones included
    pub(crate) tab_ceiling: usize,

    /// Per-page navigation timeout
    pub(crate) page_timeout_ms: u64,

    /// Navigation timeout for engine result pages
    pub(crate) engine_timeout_ms: u64,

    /// Memory ceiling used by the resource monitor
    pub(crate) memory_ceiling_mb: u64,

    /// Global request deadline, measured from request start
    pub(crate) request_deadline_ms: u64,

    /// Remaining time below which early-return is triggered
    pub(crate) deadline_safety_margin_ms: u64,

    /// How long in-flight tasks may run after early-return
    pub(crate) early_return_grace_ms: u64,

    /// Resource monitor sampling cadence
    pub(crate) sample_interval_ms: u64,

    /// Memory ratio at which concurrency is halved
    pub(crate) pressure_soft_ratio: f64,

    /// Memory ratio at which only one task may run
    pub(crate) pressure_hard_ratio: f64,

    /// Minimum words for an accepted page
    pub(crate) min_word_count: usize,

    /// Candidate cap as a multiple of the requested count
    pub(crate) candidate_multiplier: usize,

    /// Extra candidates searched for, as a fraction of requested count
    pub(crate) buffer_ratio: f64,

    /// Minimum number of extra candidates
    pub(crate) min_buffer: usize,

    /// Largest result count a caller may request
    pub(crate) max_results_limit: usize,

    /// Engine names in fallback order, primary first
    pub(crate) engine_order: Vec<String>,

    /// Blocked domain entries (see `BlockedDomains`)
    pub(crate) blocked_domains: Vec<String>,

    /// Run the browser headless
    pub(crate) headless: bool,

    /// Explicit browser executable, skipping discovery
    pub(crate) chrome_path: Option<PathBuf>,

    /// Directory for the filesystem object store; `None` leaves storage unwired
    pub(crate) storage_dir: Option<PathBuf>,

    /// Default log level when `RUST_LOG` is unset
    pub(crate) log_level: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        super::ScrapeConfigBuilder::default().into_config()
    }
}
