//! Environment-variable configuration loading
//!
//! Unset variables keep their defaults; set-but-unparseable variables are an
//! error rather than being silently ignored.

use std::str::FromStr;
use std::time::Duration;

use super::builder::ScrapeConfigBuilder;
use super::types::ScrapeConfig;
use crate::error::ScrapeError;

pub const ENV_MAX_PARALLEL_TABS: &str = "MAX_PARALLEL_TABS";
pub const ENV_MAX_TAB_CEILING: &str = "MAX_TAB_CEILING";
pub const ENV_SCRAPE_TIMEOUT_MS: &str = "SCRAPE_TIMEOUT_MS";
pub const ENV_MAX_RESULTS_LIMIT: &str = "MAX_RESULTS_LIMIT";
pub const ENV_MEMORY_MB: &str = "MEMORY_MB";
pub const ENV_LAMBDA_MEMORY: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";
pub const ENV_TIMEOUT_SECONDS: &str = "TIMEOUT_SECONDS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_ENGINE_ORDER: &str = "ENGINE_ORDER";
pub const ENV_BLOCKED_DOMAINS: &str = "BLOCKED_DOMAINS";
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";
pub const ENV_STORAGE_DIR: &str = "STORAGE_DIR";

impl ScrapeConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ScrapeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScrapeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = ScrapeConfigBuilder::default();

        if let Some(tabs) = parse::<usize>(ENV_MAX_PARALLEL_TABS, get(ENV_MAX_PARALLEL_TABS))? {
            builder = builder.max_concurrent_tabs(tabs);
            // Keep the ceiling consistent when only the tab count is raised
            if get(ENV_MAX_TAB_CEILING).is_none() {
                builder = builder.tab_ceiling(tabs.max(crate::utils::DEFAULT_TAB_CEILING));
            }
        }
        if let Some(ceiling) = parse::<usize>(ENV_MAX_TAB_CEILING, get(ENV_MAX_TAB_CEILING))? {
            builder = builder.tab_ceiling(ceiling);
        }
        if let Some(ms) = parse::<u64>(ENV_SCRAPE_TIMEOUT_MS, get(ENV_SCRAPE_TIMEOUT_MS))? {
            builder = builder.page_timeout(Duration::from_millis(ms));
        }
        if let Some(limit) = parse::<usize>(ENV_MAX_RESULTS_LIMIT, get(ENV_MAX_RESULTS_LIMIT))? {
            builder = builder.max_results_limit(limit);
        }

        let memory = match get(ENV_MEMORY_MB) {
            Some(v) => Some(v),
            None => get(ENV_LAMBDA_MEMORY),
        };
        if let Some(mb) = parse::<u64>(ENV_MEMORY_MB, memory)? {
            builder = builder.memory_ceiling_mb(mb);
        }

        if let Some(secs) = parse::<u64>(ENV_TIMEOUT_SECONDS, get(ENV_TIMEOUT_SECONDS))? {
            builder = builder.request_deadline(Duration::from_secs(secs));
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            builder = builder.log_level(level.to_ascii_lowercase());
        }
        if let Some(order) = get(ENV_ENGINE_ORDER) {
            builder = builder.engine_order(split_list(&order));
        }
        if let Some(domains) = get(ENV_BLOCKED_DOMAINS) {
            builder = builder.extra_blocked_domains(split_list(&domains));
        }
        if let Some(path) = get(ENV_CHROMIUM_PATH) {
            builder = builder.chrome_path(path);
        }
        if let Some(dir) = get(ENV_STORAGE_DIR) {
            builder = builder.storage_dir(dir);
        }

        builder.build()
    }
}

fn parse<T>(key: &str, value: Option<String>) -> Result<Option<T>, ScrapeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ScrapeError::Config(format!("{key}='{raw}' is invalid: {e}")))
        })
        .transpose()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
