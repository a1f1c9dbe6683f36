//! One scrape task: tab in, verdict out

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::driver::{PageDriver, with_page_timeout};
use crate::error::ScrapeError;
use crate::quality::{QualityFilter, RejectReason, Verdict};
use crate::session::TabPool;
use crate::types::{ScrapeResult, ScrapeTask};

/// A tab parked by a running task
///
/// `loaded` turns true once navigation finished, after which the tab holds a
/// complete page and can be reused even if the task is abandoned.
#[derive(Debug)]
pub(crate) struct ParkedTab<H> {
    pub handle: H,
    pub loaded: bool,
}

/// The tab a running task holds, visible to the coordinator
///
/// If the coordinator abandons the task, a loaded tab still parked here goes
/// back to the pool; one interrupted mid-navigation is closed.
pub(crate) type TabSlot<H> = Arc<Mutex<Option<ParkedTab<H>>>>;

fn set_loaded<H>(slot: &TabSlot<H>, loaded: bool) {
    if let Some(parked) = slot.lock().as_mut() {
        parked.loaded = loaded;
    }
}

#[derive(Debug, Clone)]
pub(crate) enum TaskOutcome {
    Accepted(ScrapeResult),
    Rejected { url: String, reason: RejectReason },
    Failed(ScrapeResult),
}

pub(crate) struct TaskContext<'a, D: PageDriver> {
    pub driver: &'a D,
    pub tabs: &'a TabPool<D::Handle>,
    pub filter: &'a QualityFilter,
    pub page_timeout: Duration,
}

impl<D: PageDriver> Clone for TaskContext<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: PageDriver> Copy for TaskContext<'_, D> {}

/// Load, extract and judge one candidate
///
/// Never fails: navigation problems become a failed [`ScrapeResult`].
pub(crate) async fn run_task<D>(
    ctx: TaskContext<'_, D>,
    task: ScrapeTask,
    slot: TabSlot<D::Handle>,
) -> TaskOutcome
where
    D: PageDriver,
{
    let handle = match ctx.tabs.acquire(ctx.driver, task.deadline).await {
        Ok(handle) => handle,
        Err(e) => return TaskOutcome::Failed(ScrapeResult::failed(&task.url, e.to_string())),
    };
    *slot.lock() = Some(ParkedTab {
        handle: handle.clone(),
        loaded: false,
    });

    // One allowance covers navigation and extraction
    let timeout = ctx
        .page_timeout
        .min(task.deadline.saturating_duration_since(Instant::now()));
    let started = Instant::now();

    let loaded = with_page_timeout(
        async {
            ctx.driver.navigate(&handle, &task.url, timeout).await?;
            set_loaded(&slot, true);
            ctx.driver.extract(&handle).await
        },
        timeout,
        &task.url,
    )
    .await;

    // Healthy tabs go straight back to the pool; broken ones are closed
    // while still parked so an abandoning coordinator can finish the job
    if loaded.is_ok() {
        if let Some(parked) = slot.lock().take() {
            ctx.tabs.checkin(parked.handle);
        }
    } else {
        set_loaded(&slot, false);
        let _ = ctx.driver.close(handle).await;
        if slot.lock().take().is_some() {
            ctx.tabs.forget();
        }
    }

    let snapshot = match loaded {
        Ok(snapshot) => snapshot,
        Err(e) => {
            debug!(rank = task.rank, url = %task.url, error = %e, "Scrape failed");
            return TaskOutcome::Failed(failure(&task, &e));
        }
    };

    trace!(
        rank = task.rank,
        url = %task.url,
        load_ms = started.elapsed().as_millis() as u64,
        "Page loaded"
    );

    match ctx.filter.evaluate(&task.url, &task.title, &snapshot) {
        Verdict::Accepted(result) => TaskOutcome::Accepted(result),
        Verdict::Rejected(reason) => TaskOutcome::Rejected {
            url: task.url,
            reason,
        },
    }
}

fn failure(task: &ScrapeTask, error: &ScrapeError) -> ScrapeResult {
    let mut result = ScrapeResult::failed(&task.url, error.to_string());
    result.title = task.title.clone();
    result
}
