//! Configuration module for search-and-scrape
//!
//! This module provides the `ScrapeConfig` struct, its builder with range
//! validation, and environment loading for serverless deployments.

// Sub-modules
pub mod builder;
pub mod env;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::ScrapeConfigBuilder;
pub use types::ScrapeConfig;
