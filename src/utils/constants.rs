//! Shared configuration constants for searchscrape
//!
//! Default values used throughout the codebase so that tuning knobs live in
//! one place instead of as magic numbers.

/// Default concurrent tabs when memory is healthy
pub const DEFAULT_MAX_CONCURRENT_TABS: usize = 11;

/// Default ceiling on live tabs for the whole browser session
pub const DEFAULT_TAB_CEILING: usize = 20;

/// Default per-page navigation timeout in milliseconds
pub const DEFAULT_PAGE_TIMEOUT_MS: u64 = 10_000;

/// Default memory ceiling in megabytes (cold compute slot size)
pub const DEFAULT_MEMORY_CEILING_MB: u64 = 3072;

/// Default global request deadline in seconds
pub const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 100;

/// Time kept in reserve before the deadline; crossing it triggers early-return
pub const DEFAULT_DEADLINE_SAFETY_MARGIN_MS: u64 = 5_000;

/// How long in-flight tasks may keep running after early-return is triggered
pub const DEFAULT_EARLY_RETURN_GRACE_MS: u64 = 2_000;

/// Resource monitor sampling cadence in milliseconds
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 500;

/// Memory ratio at which concurrency is halved
pub const DEFAULT_PRESSURE_SOFT_RATIO: f64 = 0.60;

/// Memory ratio at which the coordinator drains (concurrency 1)
pub const DEFAULT_PRESSURE_HARD_RATIO: f64 = 0.85;

/// Minimum word count for an accepted page
pub const DEFAULT_MIN_WORD_COUNT: usize = 50;

/// Candidate list cap as a multiple of the requested count
pub const DEFAULT_CANDIDATE_MULTIPLIER: usize = 3;

/// Fraction of the requested count searched for as extra buffer
pub const DEFAULT_BUFFER_RATIO: f64 = 0.5;

/// Minimum buffer of extra candidates regardless of request size
pub const DEFAULT_MIN_BUFFER: usize = 3;

/// Navigation timeout for search-engine result pages in milliseconds
pub const ENGINE_NAVIGATION_TIMEOUT_MS: u64 = 6_000;

/// Default fallback chain, primary first
pub const DEFAULT_ENGINE_ORDER: &[&str] = &["brave", "startpage", "yahoo", "yandex"];

/// Social networks, forums and low-value aggregators never worth scraping
///
/// Entries match the host exactly or any subdomain of it. An entry containing
/// `/` matches host plus path prefix. An entry starting with `.` matches a
/// top-level domain suffix.
pub const DEFAULT_BLOCKED_DOMAINS: &[&str] = &[
    "reddit.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "pinterest.com",
    "youtube.com",
    "youtu.be",
    "linkedin.com",
    "quora.com",
    "zhihu.com",
    "baidu.com",
    "weibo.com",
    "mastodon.social/@",
    ".cn",
    ".jp",
    ".kr",
];

/// Desktop user agents the identity rotator picks from
///
/// Updated: 2025-01 to Chrome 131/132 and current Firefox/Safari stable.
pub const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.6778.205 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.6778.205 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
];

/// Viewports the identity rotator picks from
pub const VIEWPORT_POOL: &[(u32, u32)] = &[
    (1920, 1080),
    (1366, 768),
    (1536, 864),
    (1440, 900),
    (2560, 1440),
];
