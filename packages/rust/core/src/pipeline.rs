//! End-to-end mirror pipeline: crawl → convert → write → navigation.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};
use url::Url;

use docmirror_crawler::{CancelToken, Crawler};
use docmirror_markdown::ConvertOptions;
use docmirror_shared::{CrawlConfig, MirrorSummary, RepairOptions, Result};

use crate::assembler::{build_url_mapping, prepare_output_dir, write_document};
use crate::navigation::write_navigation;

/// Configuration for one mirror run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Root URL to mirror.
    pub root_url: Url,
    /// Output directory for the Markdown tree.
    pub output_dir: PathBuf,
    /// Crawl configuration.
    pub crawl: CrawlConfig,
    /// Repair pipeline configuration.
    pub repair: RepairOptions,
    /// Whether to generate README/NAVIGATION pages.
    pub generate_readme: bool,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a page has been converted and written.
    fn page_converted(&self, path: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &MirrorSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_converted(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _summary: &MirrorSummary) {}
}

/// Run the full mirror pipeline.
///
/// 1. Crawl the site breadth-first from the root URL
/// 2. Map every fetched URL to a local file path
/// 3. Convert each page and write it (a page whose conversion fails gets
///    an explicit error document; the run continues)
/// 4. Generate navigation pages
///
/// A crawl that fetches zero pages is the only fatal outcome.
#[instrument(skip_all, fields(url = %config.root_url, out = %config.output_dir.display()))]
pub async fn run_mirror(
    config: &MirrorConfig,
    cancel: &CancelToken,
    progress: &dyn ProgressReporter,
) -> Result<MirrorSummary> {
    let start = Instant::now();

    prepare_output_dir(&config.output_dir)?;

    progress.phase("Crawling site");
    let crawler = Crawler::new(config.crawl.clone())?;
    let (outcome, pages) = crawler.crawl(&config.root_url, cancel).await?;

    progress.phase("Converting to Markdown");
    let url_mapping = build_url_mapping(&pages);
    let total = pages.len();
    let mut documents_written = 0;

    for (i, page) in pages.iter().enumerate() {
        let Some(local_path) = url_mapping.get(&page.url) else {
            continue;
        };

        let opts = ConvertOptions {
            source_url: page.url.clone(),
            title: Some(page.title.clone()),
            url_mapping: Some(&url_mapping),
            repair: config.repair.clone(),
        };

        // Conversion failure costs only this page; the document written in
        // its place says what went wrong.
        let markdown = match docmirror_markdown::convert(&page.html, &opts) {
            Ok(result) => result.markdown,
            Err(e) => {
                warn!(url = %page.url, error = %e, "conversion failed, writing error document");
                error_document(&page.url, &e.to_string())
            }
        };

        write_document(&config.output_dir, local_path, &markdown)?;
        documents_written += 1;
        progress.page_converted(local_path, i + 1, total);
    }

    if config.generate_readme {
        progress.phase("Generating navigation");
        write_navigation(
            &config.output_dir,
            &config.root_url,
            &pages,
            &url_mapping,
            config.crawl.max_depth,
        )?;
    }

    let summary = MirrorSummary {
        root_url: config.root_url.to_string(),
        pages_fetched: outcome.pages_fetched,
        documents_written,
        crawl_depth: config.crawl.max_depth,
        url_mapping,
        finished_at: Utc::now(),
    };

    info!(
        pages_fetched = summary.pages_fetched,
        documents_written = summary.documents_written,
        elapsed_ms = start.elapsed().as_millis(),
        "mirror complete"
    );
    progress.done(&summary);

    Ok(summary)
}

/// Placeholder document emitted when a page cannot be converted.
fn error_document(url: &str, error: &str) -> String {
    format!(
        "<!-- Original URL: {url} -->\n\n# Error converting page\n\nFailed to convert {url} to Markdown: {error}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "docmirror-pipeline-test-{}-{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    async fn mount(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    fn config(root: &str, output_dir: &Path, max_depth: u32) -> MirrorConfig {
        MirrorConfig {
            root_url: Url::parse(root).expect("valid url"),
            output_dir: output_dir.to_path_buf(),
            crawl: CrawlConfig {
                max_depth,
                delay_ms: 0,
                timeout_secs: 5,
                exclude_urls: Vec::new(),
            },
            repair: RepairOptions::default(),
            generate_readme: true,
        }
    }

    #[tokio::test]
    async fn mirror_end_to_end() {
        let server = MockServer::start().await;

        // Root links to two in-scope pages and one out-of-scope page.
        mount(
            &server,
            "/docs/",
            r#"<html><head><title>Docs Home</title></head><body><main>
                <a href="/docs/install">Install</a>
                <a href="/docs/usage">Usage</a>
                <a href="/blog/post">Blog</a>
                <p>Welcome.</p>
            </main></body></html>"#,
        )
        .await;
        mount(
            &server,
            "/docs/install",
            r#"<html><head><title>Install</title></head><body><main>
                <pre><code>pip install example</code></pre>
            </main></body></html>"#,
        )
        .await;
        mount(
            &server,
            "/docs/usage",
            "<html><head><title>Usage</title></head><body><main><p>Use it.</p></main></body></html>",
        )
        .await;

        let blog = Mock::given(method("GET"))
            .and(path("/blog/post"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount_as_scoped(&server)
            .await;

        let dir = temp_dir();
        let root = format!("{}/docs/", server.uri());
        let summary = run_mirror(&config(&root, &dir, 1), &CancelToken::new(), &SilentProgress)
            .await
            .expect("mirror run");

        assert_eq!(summary.pages_fetched, 3);
        assert_eq!(summary.documents_written, 3);
        assert_eq!(summary.url_mapping.len(), 3);

        // Every document starts with its original-URL comment.
        for (url, local_path) in &summary.url_mapping {
            let content = std::fs::read_to_string(dir.join(local_path)).expect("document");
            assert!(
                content.starts_with(&format!("<!-- Original URL: {url} -->")),
                "missing URL header in {local_path}"
            );
        }

        // Code survived conversion as a fenced block.
        let install = summary
            .url_mapping
            .iter()
            .find(|(u, _)| u.ends_with("/docs/install"))
            .map(|(_, p)| p)
            .expect("install mapped");
        let content = std::fs::read_to_string(dir.join(install)).expect("install doc");
        assert!(content.contains("pip install example"));
        assert!(content.contains("```"));

        // Navigation pages exist.
        assert!(dir.join("README.md").exists());
        assert!(dir.join("NAVIGATION.md").exists());

        drop(blog);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn mirror_skips_readme_when_disabled() {
        let server = MockServer::start().await;
        mount(&server, "/", "<html><head><title>T</title></head><body><p>x</p></body></html>")
            .await;

        let dir = temp_dir();
        let mut cfg = config(&server.uri(), &dir, 0);
        cfg.generate_readme = false;

        run_mirror(&cfg, &CancelToken::new(), &SilentProgress)
            .await
            .expect("mirror run");

        assert!(!dir.join("README.md").exists());
        assert!(dir.join("index.md").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn failed_crawl_surfaces_empty_crawl_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = temp_dir();
        let err = run_mirror(
            &config(&server.uri(), &dir, 0),
            &CancelToken::new(),
            &SilentProgress,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            docmirror_shared::DocMirrorError::EmptyCrawl { .. }
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
