//! Admission control and tab accounting in the scrape coordinator

mod common;

use std::time::Duration;

use common::*;
use kodegen_tools_searchscrape::session::TabPool;
use kodegen_tools_searchscrape::{RankedCandidate, ScrapeConfig, ScrapeCoordinator, normalize_url};
use tokio::time::Instant;

fn ranked(urls: &[String]) -> Vec<RankedCandidate> {
    urls.iter()
        .enumerate()
        .map(|(rank, url)| RankedCandidate {
            rank,
            url: url.clone(),
            title: format!("Candidate {rank}"),
            normalized: normalize_url(url),
            engine: "brave".to_string(),
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_memory_spike_drops_admission_to_one() {
    let driver = ScriptedDriver::new();
    let urls = site_urls(0..12, "site");
    for url in &urls {
        driver.page(url, Duration::from_millis(100), article(url, "Article"));
    }

    let config = ScrapeConfig::builder()
        .max_concurrent_tabs(4)
        .memory_ceiling_mb(1000)
        .sample_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    let tabs = TabPool::new(config.tab_ceiling());
    let gauge = Gauge::new(100);
    let monitor = monitor(&config, gauge.clone(), Duration::from_secs(100));

    let started = Instant::now();
    let spike = {
        let gauge = gauge.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            // 90% of the ceiling: past the hard threshold
            gauge.set(900);
        })
    };

    let report = ScrapeCoordinator::from_config(&config)
        .run(&driver, &tabs, &monitor, &ranked(&urls), 12)
        .await;
    spike.await.unwrap();

    assert_eq!(report.accepted.len(), 12);
    assert_eq!(report.peak_in_flight, 4);

    let navigations = driver.navigations();
    let before: Vec<_> = navigations
        .iter()
        .filter(|nav| nav.started_at < started + Duration::from_millis(150))
        .collect();
    let after: Vec<_> = navigations
        .iter()
        .filter(|nav| nav.started_at >= started + Duration::from_millis(170))
        .collect();

    assert!(before.iter().any(|nav| nav.concurrent == 4));
    assert!(!after.is_empty());
    assert!(
        after.iter().all(|nav| nav.concurrent == 1),
        "admitted concurrently after the spike: {after:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_navigation_failures_are_absorbed() {
    let driver = ScriptedDriver::new();
    let urls = site_urls(0..6, "site");
    for (i, url) in urls.iter().enumerate() {
        if i % 2 == 0 {
            driver.route(url, fast(), RouteResult::Fail("net::ERR_CONNECTION_REFUSED".to_string()));
        } else {
            driver.page(url, fast(), article(url, "Article"));
        }
    }

    let config = ScrapeConfig::builder().build().unwrap();
    let tabs = TabPool::new(config.tab_ceiling());
    let monitor = monitor(&config, Gauge::new(100), Duration::from_secs(100));

    let report = ScrapeCoordinator::from_config(&config)
        .run(&driver, &tabs, &monitor, &ranked(&urls), 5)
        .await;

    let got: Vec<_> = report.accepted.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(got, [urls[1].as_str(), urls[3].as_str(), urls[5].as_str()]);
    assert_eq!(report.failed.len(), 3);
    assert!(report.failed.iter().all(|r| !r.success && r.error.is_some()));
    // Each URL is tried once
    assert_eq!(driver.navigations().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_slow_page_times_out_without_blocking_batch() {
    let driver = ScriptedDriver::new();
    let urls = site_urls(0..3, "site");
    driver.page(&urls[0], Duration::from_secs(30), article(&urls[0], "Slow"));
    driver.page(&urls[1], fast(), article(&urls[1], "Fast"));
    driver.page(&urls[2], fast(), article(&urls[2], "Fast"));

    let config = ScrapeConfig::builder()
        .page_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let tabs = TabPool::new(config.tab_ceiling());
    let monitor = monitor(&config, Gauge::new(100), Duration::from_secs(100));

    let started = Instant::now();
    let report = ScrapeCoordinator::from_config(&config)
        .run(&driver, &tabs, &monitor, &ranked(&urls), 3)
        .await;

    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].error.as_deref().unwrap_or_default().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(3));
    // The timed-out tab was closed rather than reused
    assert_eq!(driver.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_live_tabs_never_exceed_ceiling() {
    let driver = ScriptedDriver::new();
    let urls = site_urls(0..10, "site");
    for url in &urls {
        driver.page(url, Duration::from_millis(200), article(url, "Article"));
    }

    let config = ScrapeConfig::builder()
        .max_concurrent_tabs(8)
        .tab_ceiling(8)
        .build()
        .unwrap();
    // A smaller pool than the admission budget forces tasks to wait for tabs
    let tabs = TabPool::new(3);
    let monitor = monitor(&config, Gauge::new(100), Duration::from_secs(100));

    let report = ScrapeCoordinator::from_config(&config)
        .run(&driver, &tabs, &monitor, &ranked(&urls), 10)
        .await;

    assert_eq!(report.accepted.len(), 10);
    assert_eq!(driver.opened(), 3);
    assert!(driver.navigations().iter().all(|nav| nav.concurrent <= 3));
    assert_eq!(tabs.live(), 3);
    assert_eq!(tabs.idle(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_enough_accepted_abandons_lower_ranked_work() {
    let driver = ScriptedDriver::new();
    let urls = site_urls(0..6, "site");
    for (i, url) in urls.iter().enumerate() {
        let delay = if i < 2 {
            Duration::from_millis(100)
        } else {
            Duration::from_secs(20)
        };
        driver.page(url, delay, article(url, "Article"));
    }

    let config = ScrapeConfig::builder().page_timeout(Duration::from_secs(30)).build().unwrap();
    let tabs = TabPool::new(config.tab_ceiling());
    let monitor = monitor(&config, Gauge::new(100), Duration::from_secs(100));

    let started = Instant::now();
    let report = ScrapeCoordinator::from_config(&config)
        .run(&driver, &tabs, &monitor, &ranked(&urls), 2)
        .await;

    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.abandoned, 4);
    assert!(!report.early_return);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(tabs.checked_out(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_page_timeout_covers_extraction() {
    let driver = ScriptedDriver::new();
    let urls = site_urls(0..3, "site");
    for url in &urls {
        driver.page(url, fast(), article(url, "Article"));
    }
    driver.stall_extract(&urls[0], Duration::from_secs(60));

    let config = ScrapeConfig::builder()
        .page_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let tabs = TabPool::new(config.tab_ceiling());
    let monitor = monitor(&config, Gauge::new(100), Duration::from_secs(100));

    let started = Instant::now();
    let report = ScrapeCoordinator::from_config(&config)
        .run(&driver, &tabs, &monitor, &ranked(&urls), 3)
        .await;

    assert!(started.elapsed() < Duration::from_secs(3));
    let got: Vec<_> = report.accepted.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(got, [urls[1].as_str(), urls[2].as_str()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].url, urls[0]);
    assert!(report.failed[0].error.as_deref().unwrap_or_default().contains("timed out"));
    assert_eq!(driver.closed(), 1);
    assert_eq!(tabs.checked_out(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_loaded_tabs_return_to_pool() {
    let driver = ScriptedDriver::new();
    let urls = site_urls(0..6, "site");
    for (i, url) in urls.iter().enumerate() {
        let delay = if i < 2 { Duration::from_millis(100) } else { fast() };
        driver.page(url, delay, article(url, "Article"));
    }
    // Lower ranks load first, then hang reading the page
    for url in &urls[2..] {
        driver.stall_extract(url, Duration::from_secs(20));
    }

    let config = ScrapeConfig::builder().page_timeout(Duration::from_secs(30)).build().unwrap();
    let tabs = TabPool::new(config.tab_ceiling());
    let monitor = monitor(&config, Gauge::new(100), Duration::from_secs(100));

    let report = ScrapeCoordinator::from_config(&config)
        .run(&driver, &tabs, &monitor, &ranked(&urls), 2)
        .await;

    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.abandoned, 4);
    assert_eq!(driver.closed(), 0);
    assert_eq!(tabs.checked_out(), 0);
    assert_eq!(tabs.idle(), 6);
}
