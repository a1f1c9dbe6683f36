//! Resource budget: memory sampling, admission policy and deadline tracking

pub mod monitor;
pub mod policy;
pub mod sampler;

pub use monitor::{BudgetState, ResourceMonitor};
pub use policy::BudgetPolicy;
pub use sampler::{MemorySampler, ProcessTreeSampler};
