//! Core domain types shared across the docmirror crates.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DocMirrorError;

// ---------------------------------------------------------------------------
// PageRecord
// ---------------------------------------------------------------------------

/// A successfully fetched page, owned by the crawler until it is handed
/// to the conversion pipeline. Immutable thereafter.
#[derive(Debug, Clone)]
pub struct PageRecord {
    /// Normalized page URL (no fragment, no query string).
    pub url: String,
    /// Crawl depth at which the page was first discovered.
    pub depth: u32,
    /// Page title (`<title>`, falling back to the first h1/h2).
    pub title: String,
    /// The raw HTML body as fetched.
    pub html: String,
    /// Outbound in-scope links, normalized, in document order.
    pub links: Vec<String>,
}

// ---------------------------------------------------------------------------
// OptimizationLevel
// ---------------------------------------------------------------------------

/// Named output-shaping strategy for AI/RAG consumption.
///
/// Levels trade structural richness for token economy; exactly one is
/// applied as the final pass of the repair pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationLevel {
    /// Normalize bare fence lines only.
    Minimal,
    /// Tag opening fences with a language guessed from the fence line.
    #[default]
    Standard,
    /// Guess languages from code content and annotate document structure.
    Enhanced,
    /// Aggressively minify for minimum token count.
    TokenOptimized,
}

impl OptimizationLevel {
    /// All levels, in increasing order of aggressiveness.
    pub const ALL: [OptimizationLevel; 4] = [
        OptimizationLevel::Minimal,
        OptimizationLevel::Standard,
        OptimizationLevel::Enhanced,
        OptimizationLevel::TokenOptimized,
    ];

    /// The canonical CLI/config spelling of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationLevel::Minimal => "minimal",
            OptimizationLevel::Standard => "standard",
            OptimizationLevel::Enhanced => "enhanced",
            OptimizationLevel::TokenOptimized => "token-optimized",
        }
    }
}

impl std::fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationLevel {
    type Err = DocMirrorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(OptimizationLevel::Minimal),
            "standard" => Ok(OptimizationLevel::Standard),
            "enhanced" => Ok(OptimizationLevel::Enhanced),
            "token-optimized" => Ok(OptimizationLevel::TokenOptimized),
            other => Err(DocMirrorError::config(format!(
                "unknown AI optimization level '{other}': expected one of \
                 minimal, standard, enhanced, token-optimized"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// RepairOptions
// ---------------------------------------------------------------------------

/// Configuration threaded through every repair-pipeline call.
///
/// This replaces the ad-hoc module-level state of earlier designs: there is
/// no implicit shared state between page conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairOptions {
    /// Final output-shaping strategy.
    pub level: OptimizationLevel,
    /// Skip the structural repair passes (fence-syntax normalization,
    /// empty-line reduction, and the level pass still apply).
    pub raw: bool,
    /// Rewrite legacy `[code]`/`[/code]` delimiters into backtick fences.
    pub force_fences: bool,
    /// Collapse every run of blank lines to a single blank line.
    pub reduce_empty_lines: bool,
    /// Opt-in: insert a clearly marked placeholder where a code block's
    /// leading line appears to have been lost by the converter.
    pub reconstruct_leading_lines: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            level: OptimizationLevel::Standard,
            raw: false,
            force_fences: true,
            reduce_empty_lines: true,
            reconstruct_leading_lines: false,
        }
    }
}

// ---------------------------------------------------------------------------
// MirrorSummary
// ---------------------------------------------------------------------------

/// End-of-run summary returned by the mirror pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorSummary {
    /// Root URL the crawl started from.
    pub root_url: String,
    /// Number of pages successfully fetched.
    pub pages_fetched: usize,
    /// Number of Markdown documents written (error placeholders included).
    pub documents_written: usize,
    /// Configured maximum crawl depth (0 = unbounded).
    pub crawl_depth: u32,
    /// Mapping from original URL to local file path, sorted by URL.
    pub url_mapping: BTreeMap<String, String>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimization_level_roundtrip() {
        for level in OptimizationLevel::ALL {
            let parsed: OptimizationLevel = level.as_str().parse().expect("parse level");
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn optimization_level_rejects_unknown() {
        let err = "turbo".parse::<OptimizationLevel>().unwrap_err();
        assert!(err.to_string().contains("turbo"));
    }

    #[test]
    fn repair_options_defaults() {
        let opts = RepairOptions::default();
        assert_eq!(opts.level, OptimizationLevel::Standard);
        assert!(opts.force_fences);
        assert!(opts.reduce_empty_lines);
        assert!(!opts.raw);
        assert!(!opts.reconstruct_leading_lines);
    }

    #[test]
    fn summary_serialization() {
        let summary = MirrorSummary {
            root_url: "https://docs.example.com/guide".into(),
            pages_fetched: 3,
            documents_written: 3,
            crawl_depth: 2,
            url_mapping: BTreeMap::from([(
                "https://docs.example.com/guide".to_string(),
                "guide.md".to_string(),
            )]),
            finished_at: Utc::now(),
        };

        let json = serde_json::to_string(&summary).expect("serialize");
        let parsed: MirrorSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.pages_fetched, 3);
        assert_eq!(parsed.url_mapping.len(), 1);
    }
}
