//! Shared types, error model, and configuration for docmirror.
//!
//! This crate is the foundation depended on by all other docmirror crates.
//! It provides:
//! - [`DocMirrorError`] — the unified error type
//! - Domain types ([`PageRecord`], [`MirrorSummary`], [`RepairOptions`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConversionConfig, CrawlConfig, CrawlPoliciesConfig, DefaultsConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocMirrorError, Result};
pub use types::{MirrorSummary, OptimizationLevel, PageRecord, RepairOptions};
