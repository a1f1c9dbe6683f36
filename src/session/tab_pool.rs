//! Bounded pool of browser tabs
//!
//! Tabs are created lazily up to a hard ceiling and returned to the idle list
//! after each task instead of being closed, so a warm session serves the next
//! request without reopening them. `live` counts idle and checked-out tabs
//! together and never exceeds `ceiling`.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::driver::PageDriver;
use crate::error::ScrapeError;

/// How often a blocked [`TabPool::acquire`] re-checks for a free slot
const ACQUIRE_POLL: Duration = Duration::from_millis(50);

/// What a checkout hands to the caller
#[derive(Debug)]
pub enum TabCheckout<H> {
    /// Reuse this idle tab
    Idle(H),
    /// A slot was reserved; the caller opens the tab itself
    Create,
}

#[derive(Debug)]
struct PoolState<H> {
    idle: Vec<H>,
    live: usize,
}

struct Reservation<'a, H> {
    pool: &'a TabPool<H>,
    held: bool,
}

impl<H> Drop for Reservation<'_, H> {
    fn drop(&mut self) {
        if self.held {
            self.pool.forget();
        }
    }
}

#[derive(Debug)]
pub struct TabPool<H> {
    ceiling: usize,
    state: Mutex<PoolState<H>>,
}

impl<H> TabPool<H> {
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                live: 0,
            }),
        }
    }

    #[must_use]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Live tabs, idle plus checked out
    #[must_use]
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    #[must_use]
    pub fn idle(&self) -> usize {
        self.state.lock().idle.len()
    }

    #[must_use]
    pub fn checked_out(&self) -> usize {
        let state = self.state.lock();
        state.live.saturating_sub(state.idle.len())
    }

    /// Take an idle tab, or reserve a slot for a new one
    ///
    /// Returns `None` when every slot up to the ceiling is checked out.
    pub fn checkout(&self) -> Option<TabCheckout<H>> {
        let mut state = self.state.lock();
        if let Some(handle) = state.idle.pop() {
            return Some(TabCheckout::Idle(handle));
        }
        if state.live < self.ceiling {
            state.live += 1;
            return Some(TabCheckout::Create);
        }
        None
    }

    /// Return a healthy tab to the idle list
    pub fn checkin(&self, handle: H) {
        self.state.lock().idle.push(handle);
    }

    /// Release a slot whose tab was closed or never opened
    pub fn forget(&self) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
    }

    /// Check out a ready tab, opening one if a slot is free
    ///
    /// Waits for another owner to check a tab in when the pool is saturated,
    /// giving up with `ResourcePressure` at `deadline`.
    pub async fn acquire<D>(&self, driver: &D, deadline: Instant) -> Result<H, ScrapeError>
    where
        D: PageDriver<Handle = H>,
    {
        loop {
            match self.checkout() {
                Some(TabCheckout::Idle(handle)) => return Ok(handle),
                Some(TabCheckout::Create) => {
                    // Released on error, or if the caller is dropped mid-open
                    let mut reservation = Reservation {
                        pool: self,
                        held: true,
                    };
                    let handle = driver.open().await?;
                    reservation.held = false;
                    return Ok(handle);
                }
                None => {
                    if Instant::now() + ACQUIRE_POLL >= deadline {
                        return Err(ScrapeError::ResourcePressure(format!(
                            "all {} tabs busy until deadline",
                            self.ceiling
                        )));
                    }
                    trace!("Tab pool saturated, waiting");
                    tokio::time::sleep(ACQUIRE_POLL).await;
                }
            }
        }
    }

    /// Hand a tab back: healthy tabs go idle, others are closed
    pub async fn release<D>(&self, driver: &D, handle: H, healthy: bool)
    where
        D: PageDriver<Handle = H>,
    {
        if healthy {
            self.checkin(handle);
        } else {
            let _ = driver.close(handle).await;
            self.forget();
        }
    }

    /// Close every idle tab; checked-out tabs are left to their owners
    pub async fn close_idle<D>(&self, driver: &D)
    where
        D: PageDriver<Handle = H>,
    {
        let idle = {
            let mut state = self.state.lock();
            let idle = std::mem::take(&mut state.idle);
            state.live = state.live.saturating_sub(idle.len());
            idle
        };
        debug!("Closing {} idle tabs", idle.len());
        for handle in idle {
            let _ = driver.close(handle).await;
        }
    }
}
