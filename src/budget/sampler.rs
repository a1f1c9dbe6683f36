//! Memory samplers feeding the resource monitor

use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Source of the current memory reading
///
/// Implementations must be cheap enough to call once per sampling interval.
pub trait MemorySampler: Send + Sync {
    /// Resident memory attributed to this request's process tree, in megabytes
    fn used_mb(&self) -> u64;
}

/// Samples resident memory of this process plus every descendant
///
/// The browser runs as child processes, so counting only our own RSS would
/// miss most of the footprint.
pub struct ProcessTreeSampler {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessTreeSampler {
    #[must_use]
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            tracing::warn!("Cannot determine current pid; memory sampling disabled");
        }
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessTreeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for ProcessTreeSampler {
    fn used_mb(&self) -> u64 {
        let Some(root) = self.pid else {
            return 0;
        };

        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let processes = system.processes();
        let mut total_bytes = 0u64;
        for (pid, process) in processes {
            // Walk up the parent chain; depth is bounded by the process table
            let mut current = Some(*pid);
            let mut hops = 0usize;
            while let Some(candidate) = current {
                if candidate == root {
                    total_bytes = total_bytes.saturating_add(process.memory());
                    break;
                }
                hops += 1;
                if hops > processes.len() {
                    break;
                }
                current = processes.get(&candidate).and_then(|p| p.parent());
            }
        }

        total_bytes / BYTES_PER_MB
    }
}
