//! Browser discovery and launch

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use crate::config::ScrapeConfig;
use crate::identity::Identity;

/// CDP request timeout for the whole session
const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn platform_candidates() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            // Serverless layers unpack here
            "/opt/chromium/chrome",
            "/opt/chrome/chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    }
}

/// Find a Chrome/Chromium executable
///
/// Order: explicit path from config, platform install locations, `which`.
pub fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            info!("Using configured browser: {}", path.display());
            return Ok(path.to_path_buf());
        }
        warn!(
            "Configured browser path does not exist: {}",
            path.display()
        );
    }

    for candidate in platform_candidates() {
        let path = PathBuf::from(candidate);
        if path.exists() {
            info!("Found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    info!("Found browser using 'which': {}", found);
                    return Ok(PathBuf::from(found));
                }
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium into the user cache directory
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir();
            warn!(
                "Could not determine cache directory, using {}",
                fallback.display()
            );
            fallback
        })
        .join("kodegen-searchscrape")
        .join("chromium");

    std::fs::create_dir_all(&cache_dir).context("Failed to create browser cache directory")?;
    info!("Downloading managed Chromium into {}", cache_dir.display());

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to fetch browser")?;

    info!("Downloaded Chromium to: {}", revision.folder_path.display());
    Ok(revision.executable_path)
}

/// Hardening and footprint flags passed to every session browser
const SESSION_FLAGS: &[&str] = &[
    // automation fingerprint
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    // sandboxed containers and small /dev/shm
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--no-zygote",
    // background work a scrape never needs
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-component-update",
    "--disable-sync",
    "--disable-breakpad",
    "--disable-hang-monitor",
    "--metrics-recording-only",
    "--no-first-run",
    "--no-default-browser-check",
    "--mute-audio",
    "--hide-scrollbars",
    // content-only mode: image URLs are read from the DOM, never fetched
    "--blink-settings=imagesEnabled=false",
];

/// Launch the session browser with `identity` baked into its command line
///
/// The returned handler task drives CDP traffic and must be aborted once the
/// browser is closed.
pub async fn launch_browser(
    config: &ScrapeConfig,
    user_data_dir: &Path,
    identity: &Identity,
) -> Result<(Browser, JoinHandle<()>)> {
    let executable = match find_browser_executable(config.chrome_path().map(PathBuf::as_path)) {
        Ok(path) => path,
        Err(e) => {
            warn!("{e}; falling back to managed download");
            download_managed_browser().await?
        }
    };

    let mut builder = BrowserConfigBuilder::default()
        .request_timeout(CDP_REQUEST_TIMEOUT)
        .window_size(identity.viewport_width, identity.viewport_height)
        .user_data_dir(user_data_dir.to_path_buf())
        .chrome_executable(executable);
    builder = if config.headless() {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let identity_flags = [
        format!("--user-agent={}", identity.user_agent),
        format!("--lang={}", identity.locale),
    ];
    let browser_config = SESSION_FLAGS
        .iter()
        .map(|flag| (*flag).to_string())
        .chain(identity_flags)
        .fold(builder, |builder, flag| builder.arg(flag))
        .build()
        .map_err(|e| anyhow::anyhow!("Invalid browser launch config: {e}"))?;

    info!(
        headless = config.headless(),
        flags = SESSION_FLAGS.len() + 2,
        "Launching session browser"
    );
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Browser process failed to start")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();
            // Newer CDP events chromiumoxide cannot decode
            if message.contains("untagged enum Message") || message.contains("deserialize WS response") {
                trace!(%message, "Ignoring undecodable CDP event");
            } else {
                error!(error = ?e, "CDP handler error");
            }
        }
        debug!("CDP handler finished");
    });

    Ok((browser, handler_task))
}
