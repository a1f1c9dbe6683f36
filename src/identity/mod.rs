//! Browser identity rotation
//!
//! An [`Identity`] is drawn once per browser session and applied to every tab
//! the session opens, so a fingerprint never changes within a session.

pub mod stealth;

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::utils::{USER_AGENT_POOL, VIEWPORT_POOL};

pub use stealth::apply_identity;

pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Fingerprint presented by every tab of one browser session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub locale: String,
    pub accept_language: String,
    pub timezone: String,
    /// `navigator.platform` consistent with the user agent
    pub platform: String,
    pub hardware_concurrency: u32,
    /// Hex seed shared by the canvas noise evasion for this session
    pub session_seed: String,
}

impl Identity {
    /// Draw a random identity from the curated pools
    #[must_use]
    pub fn random() -> Self {
        let mut rng = rand::rng();
        let user_agent = USER_AGENT_POOL
            .choose(&mut rng)
            .copied()
            .unwrap_or(USER_AGENT_POOL[0]);
        let (width, height) = VIEWPORT_POOL
            .choose(&mut rng)
            .copied()
            .unwrap_or(VIEWPORT_POOL[0]);

        Self::with(user_agent, width, height)
    }

    /// Build an identity from an explicit user agent and viewport
    #[must_use]
    pub fn with(user_agent: &str, viewport_width: u32, viewport_height: u32) -> Self {
        let seed: Vec<u8> = (0..16).map(|_| rand::random::<u8>()).collect();
        Self {
            user_agent: user_agent.to_string(),
            viewport_width,
            viewport_height,
            locale: DEFAULT_LOCALE.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            platform: platform_for(user_agent).to_string(),
            hardware_concurrency: 8,
            session_seed: hex::encode(seed),
        }
    }
}

fn platform_for(user_agent: &str) -> &'static str {
    if user_agent.contains("Macintosh") {
        "MacIntel"
    } else if user_agent.contains("Linux") {
        "Linux x86_64"
    } else {
        "Win32"
    }
}
