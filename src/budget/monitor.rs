//! Resource monitor: elapsed time plus memory, folded into a [`BudgetState`]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use super::policy::BudgetPolicy;
use super::sampler::MemorySampler;
use crate::config::ScrapeConfig;

/// Snapshot read by every admission decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BudgetState {
    pub elapsed_ms: u64,
    pub memory_used_mb: u64,
    pub memory_ceiling_mb: u64,
    /// Derived from `memory_used_mb` alone, always at least 1
    pub recommended_concurrency: usize,
    /// Remaining time is inside the safety margin
    pub early_return: bool,
}

#[derive(Debug, Clone, Copy)]
struct MemoryReading {
    taken_at: Instant,
    used_mb: u64,
}

/// Produces budget states for one request
///
/// The memory sample is reused for at most one sampling interval; elapsed time
/// and the early-return flag are always computed fresh.
pub struct ResourceMonitor {
    sampler: Arc<dyn MemorySampler>,
    policy: BudgetPolicy,
    started: Instant,
    deadline: Instant,
    safety_margin: Duration,
    sample_interval: Duration,
    last: Mutex<Option<MemoryReading>>,
}

impl ResourceMonitor {
    pub fn new(
        sampler: Arc<dyn MemorySampler>,
        policy: BudgetPolicy,
        started: Instant,
        deadline: Instant,
        safety_margin: Duration,
        sample_interval: Duration,
    ) -> Self {
        Self {
            sampler,
            policy,
            started,
            deadline,
            safety_margin,
            sample_interval,
            last: Mutex::new(None),
        }
    }

    /// Monitor for a request that started at `started` and must finish by `deadline`
    pub fn for_request(
        config: &ScrapeConfig,
        sampler: Arc<dyn MemorySampler>,
        started: Instant,
        deadline: Instant,
    ) -> Self {
        Self::new(
            sampler,
            BudgetPolicy::from_config(config),
            started,
            deadline,
            config.deadline_safety_margin(),
            config.sample_interval(),
        )
    }

    #[must_use]
    pub fn policy(&self) -> &BudgetPolicy {
        &self.policy
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.started)
    }

    /// Time left before the hard deadline
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Remaining time has dropped inside the safety margin
    #[must_use]
    pub fn should_early_return(&self) -> bool {
        self.remaining() <= self.safety_margin
    }

    fn memory_used_mb(&self) -> u64 {
        let now = Instant::now();
        let mut last = self.last.lock();
        if let Some(reading) = *last
            && now.saturating_duration_since(reading.taken_at) < self.sample_interval
        {
            return reading.used_mb;
        }
        let used_mb = self.sampler.used_mb();
        *last = Some(MemoryReading {
            taken_at: now,
            used_mb,
        });
        used_mb
    }

    /// Current budget state
    #[must_use]
    pub fn sample(&self) -> BudgetState {
        let memory_used_mb = self.memory_used_mb();
        BudgetState {
            elapsed_ms: u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
            memory_used_mb,
            memory_ceiling_mb: self.policy.memory_ceiling_mb,
            recommended_concurrency: self.policy.recommended_concurrency(memory_used_mb),
            early_return: self.should_early_return(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct Gauge {
        mb: AtomicU64,
        reads: AtomicUsize,
    }

    impl MemorySampler for Gauge {
        fn used_mb(&self) -> u64 {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.mb.load(Ordering::SeqCst)
        }
    }

    fn monitor(gauge: Arc<Gauge>, deadline: Duration) -> ResourceMonitor {
        let now = Instant::now();
        ResourceMonitor::new(
            gauge,
            BudgetPolicy {
                max_concurrency: 10,
                memory_ceiling_mb: 1000,
                soft_ratio: 0.6,
                hard_ratio: 0.85,
            },
            now,
            now + deadline,
            Duration::from_secs(5),
            Duration::from_millis(500),
        )
    }

    fn gauge(mb: u64) -> Arc<Gauge> {
        Arc::new(Gauge {
            mb: AtomicU64::new(mb),
            reads: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_is_reused_within_interval() {
        let g = gauge(100);
        let m = monitor(g.clone(), Duration::from_secs(100));

        assert_eq!(m.sample().recommended_concurrency, 10);
        g.mb.store(900, Ordering::SeqCst);
        // Still inside the interval: cached reading
        assert_eq!(m.sample().recommended_concurrency, 10);
        assert_eq!(g.reads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_millis(500)).await;
        let state = m.sample();
        assert_eq!(state.memory_used_mb, 900);
        assert_eq!(state.recommended_concurrency, 1);
        assert_eq!(g.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_from_latest_sample_only() {
        let g = gauge(900);
        let m = monitor(g.clone(), Duration::from_secs(100));
        assert_eq!(m.sample().recommended_concurrency, 1);

        g.mb.store(100, Ordering::SeqCst);
        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(m.sample().recommended_concurrency, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_return_inside_margin() {
        let m = monitor(gauge(0), Duration::from_secs(20));
        assert!(!m.sample().early_return);

        tokio::time::advance(Duration::from_secs(14)).await;
        assert!(!m.should_early_return());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(m.should_early_return());
        let state = m.sample();
        assert!(state.early_return);
        assert_eq!(state.elapsed_ms, 15_000);
    }
}
