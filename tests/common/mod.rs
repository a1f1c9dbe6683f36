//! Shared fixtures: a scripted in-memory page driver and memory gauge
//!
//! Lets the pipeline run end to end without a browser. Routes are matched by
//! URL prefix, in insertion order.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_tools_searchscrape::budget::{MemorySampler, ResourceMonitor};
use kodegen_tools_searchscrape::{PageDriver, PageSnapshot, ScrapeConfig, ScrapeError};
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum RouteResult {
    Page(PageSnapshot),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct Route {
    pub delay: Duration,
    pub result: RouteResult,
}

#[derive(Debug, Clone)]
pub struct NavRecord {
    pub url: String,
    pub started_at: Instant,
    /// Navigations in progress including this one
    pub concurrent: usize,
}

#[derive(Default)]
struct DriverState {
    routes: Vec<(String, Route)>,
    current: std::collections::HashMap<u64, String>,
    navigations: Vec<NavRecord>,
    /// Extraction delays by URL prefix
    extract_stalls: Vec<(String, Duration)>,
}

/// In-memory [`PageDriver`] with per-URL delays and outcomes
#[derive(Default)]
pub struct ScriptedDriver {
    state: Mutex<DriverState>,
    next_tab: AtomicU64,
    opened: AtomicUsize,
    closed: AtomicUsize,
    in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, prefix: impl Into<String>, delay: Duration, result: RouteResult) {
        self.state.lock().routes.push((
            prefix.into(),
            Route { delay, result },
        ));
    }

    pub fn page(&self, url: &str, delay: Duration, snapshot: PageSnapshot) {
        self.route(url, delay, RouteResult::Page(snapshot));
    }

    /// Make extraction hang for `delay` on pages under `prefix`
    pub fn stall_extract(&self, prefix: impl Into<String>, delay: Duration) {
        self.state.lock().extract_stalls.push((prefix.into(), delay));
    }

    pub fn navigations(&self) -> Vec<NavRecord> {
        self.state.lock().navigations.clone()
    }

    pub fn visited(&self, prefix: &str) -> bool {
        self.state
            .lock()
            .navigations
            .iter()
            .any(|nav| nav.url.starts_with(prefix))
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> Option<Route> {
        self.state
            .lock()
            .routes
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, route)| route.clone())
    }
}

impl PageDriver for ScriptedDriver {
    type Handle = u64;

    async fn open(&self) -> Result<u64, ScrapeError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_tab.fetch_add(1, Ordering::SeqCst))
    }

    async fn navigate(&self, tab: &u64, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        {
            let mut state = self.state.lock();
            state.navigations.push(NavRecord {
                url: url.to_string(),
                started_at: Instant::now(),
                concurrent,
            });
            state.current.insert(*tab, url.to_string());
        }

        let Some(route) = self.lookup(url) else {
            return Err(ScrapeError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"));
        };

        if tokio::time::timeout(timeout, tokio::time::sleep(route.delay))
            .await
            .is_err()
        {
            return Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout,
            });
        }

        match route.result {
            RouteResult::Page(_) => Ok(()),
            RouteResult::Fail(reason) => Err(ScrapeError::navigation(url, reason)),
        }
    }

    async fn extract(&self, tab: &u64) -> Result<PageSnapshot, ScrapeError> {
        let url = self
            .state
            .lock()
            .current
            .get(tab)
            .cloned()
            .ok_or_else(|| ScrapeError::Browser("tab never navigated".to_string()))?;
        let stall = self
            .state
            .lock()
            .extract_stalls
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        match self.lookup(&url).map(|route| route.result) {
            Some(RouteResult::Page(snapshot)) => Ok(snapshot),
            _ => Err(ScrapeError::Browser(format!("nothing to extract at {url}"))),
        }
    }

    async fn close(&self, tab: u64) -> Result<(), ScrapeError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.state.lock().current.remove(&tab);
        Ok(())
    }
}

/// Memory reading the test can move at will
#[derive(Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new(mb: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(mb)))
    }

    pub fn set(&self, mb: u64) {
        self.0.store(mb, Ordering::SeqCst);
    }
}

impl MemorySampler for Gauge {
    fn used_mb(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn words(n: usize) -> String {
    (0..n)
        .map(|i| format!("token{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A page that passes the quality filter
pub fn article(url: &str, title: &str) -> PageSnapshot {
    PageSnapshot {
        url: url.to_string(),
        title: title.to_string(),
        text: words(120),
        images: Vec::new(),
        html: String::new(),
        http_status: Some(200),
    }
}

/// A page that the quality filter rejects for length
pub fn thin_page(url: &str) -> PageSnapshot {
    PageSnapshot {
        url: url.to_string(),
        title: "Thin".to_string(),
        text: words(10),
        images: Vec::new(),
        html: String::new(),
        http_status: Some(200),
    }
}

/// Result page in Brave's markup
pub fn brave_results(urls: &[String]) -> PageSnapshot {
    let items: String = urls
        .iter()
        .enumerate()
        .map(|(i, url)| format!(r#"<div class="snippet"><a href="{url}">Result {i}</a></div>"#))
        .collect();
    PageSnapshot {
        url: "https://search.brave.com/search".to_string(),
        title: "Brave Search".to_string(),
        html: format!(r#"<html><body><div id="results">{items}</div></body></html>"#),
        ..PageSnapshot::default()
    }
}

/// Result page in Startpage's markup
pub fn startpage_results(urls: &[String]) -> PageSnapshot {
    let items: String = urls
        .iter()
        .enumerate()
        .map(|(i, url)| format!(r#"<a class="w-gl__result-url" href="{url}">Result {i}</a>"#))
        .collect();
    PageSnapshot {
        url: "https://www.startpage.com/do/search".to_string(),
        title: "Startpage".to_string(),
        html: format!("<html><body>{items}</body></html>"),
        ..PageSnapshot::default()
    }
}

pub fn empty_results(url: &str) -> PageSnapshot {
    PageSnapshot {
        url: url.to_string(),
        html: "<html><body><p>No results found.</p></body></html>".to_string(),
        ..PageSnapshot::default()
    }
}

/// `https://site{i}.test/article` for each i
pub fn site_urls(range: std::ops::Range<usize>, host_prefix: &str) -> Vec<String> {
    range
        .map(|i| format!("https://{host_prefix}{i}.test/article"))
        .collect()
}

pub const BRAVE_PREFIX: &str = "https://search.brave.com/";
pub const STARTPAGE_PREFIX: &str = "https://www.startpage.com/";
pub const YAHOO_PREFIX: &str = "https://search.yahoo.com/";
pub const YANDEX_PREFIX: &str = "https://yandex.com/";

pub fn fast() -> Duration {
    Duration::from_millis(50)
}

/// Monitor for a request starting now with the given deadline
pub fn monitor(config: &ScrapeConfig, gauge: Arc<Gauge>, deadline: Duration) -> ResourceMonitor {
    let now = Instant::now();
    ResourceMonitor::for_request(config, gauge, now, now + deadline)
}
