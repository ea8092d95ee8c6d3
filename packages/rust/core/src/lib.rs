//! Mirror orchestration: crawl, convert, assemble, navigate.
//!
//! This crate ties the crawler and converter together:
//! - [`pipeline`] — The end-to-end mirror run
//! - [`assembler`] — URL-to-path mapping and document writing
//! - [`navigation`] — README and site-map generation

pub mod assembler;
pub mod navigation;
pub mod pipeline;

pub use assembler::{build_url_mapping, filename_from_url, sanitize_path};
pub use pipeline::{MirrorConfig, ProgressReporter, SilentProgress, run_mirror};
