//! Per-session user-data directories
//!
//! Every launch gets a fresh `{prefix}_{uuid}` directory, so a relaunch after
//! a crash never trips over the previous process's SingletonLock.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// A user-data directory removed when the session lets go of it
///
/// Drop only after the browser has exited; a live process keeps files locked.
#[derive(Debug)]
pub struct SessionProfile {
    dir: PathBuf,
    remove_on_drop: bool,
}

impl SessionProfile {
    /// Create a profile under the system temp directory
    pub fn create(prefix: &str) -> Result<Self> {
        Self::create_in(&std::env::temp_dir(), prefix)
    }

    pub fn create_in(base: &Path, prefix: &str) -> Result<Self> {
        let dir = base.join(format!("{prefix}_{}", Uuid::new_v4()));
        // create_dir refuses an existing path
        std::fs::create_dir(&dir)
            .with_context(|| format!("Cannot create session profile {}", dir.display()))?;
        debug!(profile = %dir.display(), "Session profile created");
        Ok(Self {
            dir,
            remove_on_drop: true,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Leave the directory on disk, e.g. to inspect a crashed session
    pub fn persist(&mut self) {
        self.remove_on_drop = false;
    }
}

impl Drop for SessionProfile {
    fn drop(&mut self) {
        if !self.remove_on_drop || !self.dir.exists() {
            return;
        }
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(profile = %self.dir.display(), "Session profile removed"),
            Err(e) => warn!(profile = %self.dir.display(), error = %e, "Session profile left behind"),
        }
    }
}
