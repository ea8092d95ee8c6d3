//! Web crawler for mirroring documentation sites.
//!
//! This crate provides:
//! - [`scope`] — URL normalization and scope/exclusion decisions
//! - [`frontier`] — The breadth-first traversal queue and visited set
//! - [`engine`] — The sequential, polite crawl driver

pub mod engine;
pub mod frontier;
pub mod scope;

pub use engine::{CancelToken, CrawlOutcome, Crawler};
pub use frontier::{Frontier, FrontierEntry};
pub use scope::{CrawlScope, normalize_url};
