//! Browser session lifecycle
//!
//! One browser process per warm instance, launched on first use, shared by
//! concurrent requests through ref-counted leases, with a bounded tab pool.

pub mod launch;
pub mod manager;
pub mod profile;
pub mod tab_pool;

pub use launch::{download_managed_browser, find_browser_executable, launch_browser};
pub use manager::{BrowserSession, SessionLease, SessionManager};
pub use profile::SessionProfile;
pub use tab_pool::{TabCheckout, TabPool};
