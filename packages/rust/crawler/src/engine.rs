//! Sequential, scope-aware crawl engine.
//!
//! Drives the [`Frontier`] breadth-first: one HTTP GET per popped entry,
//! a politeness delay between consecutive fetch attempts, and link
//! discovery feeding back into the frontier. Fetch failures drop the page
//! and continue; only a run with zero fetched pages is an error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use docmirror_shared::{CrawlConfig, DocMirrorError, PageRecord, Result};

use crate::frontier::Frontier;
use crate::scope::{CrawlScope, normalize_url};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("docmirror/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked between frontier pops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The crawl stops before its next fetch.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// CrawlOutcome
// ---------------------------------------------------------------------------

/// Summary of a completed crawl.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Number of pages successfully fetched.
    pub pages_fetched: usize,
    /// Number of fetch attempts that failed (network error or non-2xx).
    pub pages_failed: usize,
    /// Failed fetches as (URL, error message) pairs.
    pub errors: Vec<(String, String)>,
    /// Deepest depth at which a page was fetched.
    pub max_depth_seen: u32,
    /// Total crawl duration.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Sequential web crawler with scope-aware page fetching.
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocMirrorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Crawl breadth-first from `root`, returning fetched pages in visit order.
    ///
    /// Fetches are strictly sequential with `delay_ms` between consecutive
    /// attempts. A page that fails to fetch is logged and dropped — never
    /// retried, and its links are never followed. Returns
    /// [`DocMirrorError::EmptyCrawl`] if no page at all could be fetched.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn crawl(
        &self,
        root: &Url,
        cancel: &CancelToken,
    ) -> Result<(CrawlOutcome, Vec<PageRecord>)> {
        let start = std::time::Instant::now();

        let scope = CrawlScope::new(root, &self.config.exclude_urls);
        let mut frontier = Frontier::new(root, scope, self.config.max_depth);

        let mut pages: Vec<PageRecord> = Vec::new();
        let mut errors: Vec<(String, String)> = Vec::new();
        let mut max_depth_seen = 0;
        let mut first_fetch = true;

        info!(
            max_depth = self.config.max_depth,
            delay_ms = self.config.delay_ms,
            "starting crawl"
        );

        while let Some(entry) = frontier.next() {
            if cancel.is_cancelled() {
                info!(pages_fetched = pages.len(), "crawl cancelled");
                break;
            }

            // The root is seeded unchecked; everything else was filtered at
            // offer time.
            if frontier.scope().is_excluded(&entry.url) {
                debug!(url = %entry.url, "skipping excluded URL");
                continue;
            }

            frontier.mark_visited(&entry.url);

            // Politeness throttle between consecutive fetch attempts.
            if !first_fetch && self.config.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
            }
            first_fetch = false;

            debug!(url = %entry.url, depth = entry.depth, "fetching page");

            let html = match self.fetch(&entry.url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "fetch failed, dropping page");
                    errors.push((entry.url.clone(), e.to_string()));
                    continue;
                }
            };

            let base = match Url::parse(&entry.url) {
                Ok(u) => u,
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "unparseable URL, dropping page");
                    errors.push((entry.url.clone(), e.to_string()));
                    continue;
                }
            };

            let doc = Html::parse_document(&html);
            let title = extract_title(&doc);
            let links = extract_links(&doc, &base, frontier.scope());

            for link in &links {
                frontier.offer(link, entry.depth + 1);
            }

            max_depth_seen = max_depth_seen.max(entry.depth);
            pages.push(PageRecord {
                url: entry.url,
                depth: entry.depth,
                title,
                html,
                links,
            });
        }

        if pages.is_empty() {
            return Err(DocMirrorError::EmptyCrawl {
                url: root.to_string(),
            });
        }

        let outcome = CrawlOutcome {
            pages_fetched: pages.len(),
            pages_failed: errors.len(),
            errors,
            max_depth_seen,
            duration: start.elapsed(),
        };

        info!(
            pages_fetched = outcome.pages_fetched,
            pages_failed = outcome.pages_failed,
            max_depth_seen = outcome.max_depth_seen,
            duration_ms = outcome.duration.as_millis(),
            "crawl completed"
        );

        Ok((outcome, pages))
    }

    /// Issue a single GET; 2xx is success, everything else is a failure.
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocMirrorError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocMirrorError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| DocMirrorError::Network(format!("{url}: body read failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Extraction helpers
// ---------------------------------------------------------------------------

/// Extract the page title: `<title>`, falling back to the first h1, then h2.
fn extract_title(doc: &Html) -> String {
    for sel_str in ["title", "h1", "h2"] {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                let text = el.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    return text;
                }
            }
        }
    }

    "Untitled".to_string()
}

/// Extract in-scope, non-excluded links, normalized, in document order.
fn extract_links(doc: &Html, base_url: &Url, scope: &CrawlScope) -> Vec<String> {
    let Ok(link_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        // Skip anchors, javascript:, mailto:
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(resolved) = base_url.join(href) else {
            continue;
        };

        let normalized = normalize_url(&resolved);
        if scope.in_scope(&resolved) && !scope.is_excluded(&normalized) {
            links.push(normalized);
        }
    }

    links
}
