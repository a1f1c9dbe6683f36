//! Parallel scrape coordinator

pub mod coordinator;
mod task;

pub use coordinator::{BatchReport, ScrapeCoordinator};
