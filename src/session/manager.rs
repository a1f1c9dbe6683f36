//! Process-wide browser session with ref-counted leases
//!
//! # Lifecycle
//! - Nothing is launched until the first [`SessionManager::acquire`]
//! - Later acquisitions health-check the browser and reuse it, relaunching
//!   after a crash
//! - Every in-flight request holds a [`SessionLease`]; [`SessionManager::shutdown`]
//!   waits for the lease count to reach zero before closing the browser
//! - Shutdown is idempotent, and a later acquire launches a fresh browser

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chromiumoxide::page::Page;
use once_cell::sync::OnceCell;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::launch::launch_browser;
use super::profile::SessionProfile;
use super::tab_pool::TabPool;
use crate::config::ScrapeConfig;
use crate::driver::ChromiumDriver;
use crate::error::ScrapeError;
use crate::identity::Identity;

/// Longest shutdown waits for in-flight leases before closing anyway
const SHUTDOWN_LEASE_WAIT: Duration = Duration::from_secs(30);

const PROFILE_PREFIX: &str = "searchscrape_chrome";

static GLOBAL: OnceCell<SessionManager> = OnceCell::new();

/// Aborts the CDP handler task when dropped
struct HandlerGuard(JoinHandle<()>);

impl Drop for HandlerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// One live browser process with its tabs and fingerprint
pub struct BrowserSession {
    driver: ChromiumDriver,
    tabs: TabPool<Page>,
    handler: HandlerGuard,
    profile: SessionProfile,
    launched_at: Instant,
}

impl BrowserSession {
    async fn launch(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let started = Instant::now();
        let profile = SessionProfile::create(PROFILE_PREFIX)
            .map_err(|e| ScrapeError::Browser(format!("{e:#}")))?;

        let identity = Identity::random();
        let (browser, handler) = launch_browser(config, profile.path(), &identity)
            .await
            .map_err(|e| ScrapeError::Browser(format!("{e:#}")))?;

        info!(
            user_agent = %identity.user_agent,
            viewport = %format!("{}x{}", identity.viewport_width, identity.viewport_height),
            launch_ms = started.elapsed().as_millis() as u64,
            "Browser session ready"
        );

        Ok(Self {
            driver: ChromiumDriver::new(Arc::new(browser), identity),
            tabs: TabPool::new(config.tab_ceiling()),
            handler: HandlerGuard(handler),
            profile,
            launched_at: Instant::now(),
        })
    }

    #[must_use]
    pub fn driver(&self) -> &ChromiumDriver {
        &self.driver
    }

    #[must_use]
    pub fn tabs(&self) -> &TabPool<Page> {
        &self.tabs
    }

    #[must_use]
    pub fn age(&self) -> Duration {
        self.launched_at.elapsed()
    }

    /// Close tabs, close the browser, wait for the process, remove the profile
    async fn close(self) {
        self.tabs.close_idle(&self.driver).await;

        let BrowserSession {
            driver,
            tabs,
            handler,
            profile,
            ..
        } = self;
        drop(tabs);

        match Arc::try_unwrap(driver.into_browser()) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    warn!("Failed to close browser cleanly: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    warn!("Failed to wait for browser exit: {}", e);
                }
            }
            Err(_) => {
                warn!("Browser still shared at close; relying on drop to kill it");
            }
        }

        drop(handler);
        drop(profile);
    }
}

/// Tracks outstanding leases
#[derive(Default)]
struct LeaseTracker {
    active: AtomicUsize,
    idle: Notify,
}

/// One counted claim; releasing the last one wakes a waiting shutdown
struct LeaseClaim(Arc<LeaseTracker>);

impl LeaseClaim {
    fn new(tracker: &Arc<LeaseTracker>) -> Self {
        tracker.active.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(tracker))
    }
}

impl Drop for LeaseClaim {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// A request's claim on the session
///
/// Dropping the lease releases the claim.
pub struct SessionLease {
    session: Arc<BrowserSession>,
    _claim: LeaseClaim,
}

impl SessionLease {
    #[must_use]
    pub fn session(&self) -> &BrowserSession {
        &self.session
    }
}

/// Owner of the single browser session
pub struct SessionManager {
    config: ScrapeConfig,
    session: Mutex<Option<Arc<BrowserSession>>>,
    tracker: Arc<LeaseTracker>,
}

impl SessionManager {
    #[must_use]
    pub fn new(config: ScrapeConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
            tracker: Arc::new(LeaseTracker::default()),
        }
    }

    /// The process-wide manager; the first caller's configuration wins
    pub fn global(config: &ScrapeConfig) -> &'static SessionManager {
        GLOBAL.get_or_init(|| SessionManager::new(config.clone()))
    }

    /// The process-wide manager if it was ever initialised
    pub fn try_global() -> Option<&'static SessionManager> {
        GLOBAL.get()
    }

    /// Outstanding leases
    #[must_use]
    pub fn active_leases(&self) -> usize {
        self.tracker.active.load(Ordering::Acquire)
    }

    /// Lease the session, launching or relaunching the browser as needed
    pub async fn acquire(&self) -> Result<SessionLease, ScrapeError> {
        let mut guard = self.session.lock().await;

        if let Some(session) = guard.as_ref() {
            if session.driver().is_alive().await {
                debug!("Browser health check passed, reusing session");
            } else {
                warn!("Browser health check failed, relaunching");
                if let Some(dead) = guard.take() {
                    match Arc::try_unwrap(dead) {
                        Ok(dead) => dead.close().await,
                        Err(_) => debug!("Dead session still leased; it closes when released"),
                    }
                }
            }
        }

        let session = match guard.as_ref() {
            Some(session) => Arc::clone(session),
            None => {
                info!("Launching browser session");
                let session = Arc::new(BrowserSession::launch(&self.config).await?);
                *guard = Some(Arc::clone(&session));
                session
            }
        };

        Ok(SessionLease {
            session,
            _claim: LeaseClaim::new(&self.tracker),
        })
    }

    /// Wait for leases to drain, then close the browser
    ///
    /// Safe to call repeatedly; calls after the first find nothing to close.
    pub async fn shutdown(&self) {
        let drained = async {
            loop {
                let notified = self.tracker.idle.notified();
                if self.active_leases() == 0 {
                    break;
                }
                notified.await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_LEASE_WAIT, drained).await.is_err() {
            warn!(
                "Shutting down with {} leases still outstanding",
                self.active_leases()
            );
        }

        let session = self.session.lock().await.take();
        let Some(session) = session else {
            debug!("Shutdown: no browser session running");
            return;
        };

        info!("Shutting down browser session");
        match Arc::try_unwrap(session) {
            Ok(session) => session.close().await,
            Err(_) => warn!("Session still referenced after lease wait; dropping it"),
        }
    }
}
