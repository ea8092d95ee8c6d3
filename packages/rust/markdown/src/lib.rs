//! HTML-to-Markdown conversion for mirrored documentation pages.
//!
//! [`convert`] is the entry point: sanitize the HTML, hand it to `htmd`,
//! then run the repair pipeline over the output. The final document starts
//! with an HTML comment recording the page's original URL, a title
//! heading, and an optional metadata list, followed by the repaired body.

pub mod repair;
pub mod sanitize;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use docmirror_shared::{DocMirrorError, RepairOptions, Result};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting one HTML page to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Final Markdown document, header included.
    pub markdown: String,
    /// Extracted or overridden page title.
    pub title: String,
}

/// Options for one page conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions<'a> {
    /// Source URL, used for the header and for resolving relative links.
    pub source_url: String,
    /// Title override; extracted from the HTML when `None`.
    pub title: Option<String>,
    /// URL-to-local-path mapping for rewriting internal links.
    pub url_mapping: Option<&'a BTreeMap<String, String>>,
    /// Repair pipeline configuration.
    pub repair: RepairOptions,
}

impl<'a> ConvertOptions<'a> {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: None,
            url_mapping: None,
            repair: RepairOptions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Convert an HTML page to a repaired Markdown document.
///
/// Steps:
/// 1. Sanitize: strip chrome, drop empty code containers
/// 2. Normalize highlighter markup into bare `<pre><code>`
/// 3. Convert HTML to Markdown via `htmd`
/// 4. Run the repair pipeline
/// 5. Rewrite links (crawled pages to local paths, the rest to absolute)
/// 6. Prepend the source-URL comment, title heading, and metadata list
#[instrument(skip(html, opts), fields(url = %opts.source_url))]
pub fn convert(html: &str, opts: &ConvertOptions) -> Result<ConvertResult> {
    let cleaned = sanitize::clean(html);
    let normalized = sanitize::normalize_for_conversion(&cleaned);

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    let raw_markdown = converter
        .convert(&normalized)
        .map_err(|e| DocMirrorError::Conversion(format!("htmd conversion failed: {e}")))?;

    debug!(raw_len = raw_markdown.len(), "htmd conversion complete");

    let repaired = repair::repair(&raw_markdown, &opts.repair);

    let base_url = Url::parse(&opts.source_url).ok();
    let linked = rewrite_links(&repaired, base_url.as_ref(), opts.url_mapping);

    let metadata = extract_metadata(&cleaned);
    let title = opts
        .title
        .clone()
        .or_else(|| metadata.get("title").cloned())
        .or_else(|| metadata.get("main_heading").cloned())
        .unwrap_or_else(|| "Untitled".to_string());

    let header = build_header(&opts.source_url, &title, &metadata);
    let markdown = format!("{header}\n{linked}");

    debug!(title = %title, final_len = markdown.len(), "conversion complete");

    Ok(ConvertResult { markdown, title })
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Metadata keys folded into the title rather than the metadata list.
const TITLE_KEYS: &[&str] = &["title", "main_heading"];

fn build_header(url: &str, title: &str, metadata: &BTreeMap<String, String>) -> String {
    let mut lines = vec![format!("<!-- Original URL: {url} -->"), String::new()];

    lines.push(format!("# {title}"));
    lines.push(String::new());

    let extra: Vec<(&String, &String)> = metadata
        .iter()
        .filter(|(k, _)| !TITLE_KEYS.contains(&k.as_str()))
        .collect();

    if !extra.is_empty() {
        lines.push("## Metadata".to_string());
        for (key, value) in extra {
            lines.push(format!("- **{key}**: {value}"));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Pull page metadata out of the sanitized HTML: meta tags keyed by
/// `name`/`property`, the document title, and the first h1.
fn extract_metadata(html: &str) -> BTreeMap<String, String> {
    let doc = Html::parse_document(html);
    let mut metadata = BTreeMap::new();

    if let Ok(meta_sel) = Selector::parse("meta") {
        for meta in doc.select(&meta_sel) {
            let name = meta
                .value()
                .attr("name")
                .or_else(|| meta.value().attr("property"));
            if let (Some(name), Some(content)) = (name, meta.value().attr("content")) {
                metadata.insert(name.to_string(), content.to_string());
            }
        }
    }

    for (sel_str, key) in [("title", "title"), ("h1", "main_heading")] {
        if let Ok(selector) = Selector::parse(sel_str) {
            if let Some(el) = doc.select(&selector).next() {
                let text = el.text().collect::<String>().trim().to_string();
                if !text.is_empty() {
                    metadata.insert(key.to_string(), text);
                }
            }
        }
    }

    metadata
}

// ---------------------------------------------------------------------------
// Link rewriting
// ---------------------------------------------------------------------------

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("valid regex"));

/// Rewrite Markdown links: crawled pages point at their local file,
/// everything else resolves to an absolute URL. Images, anchors, and
/// fence interiors are left alone.
fn rewrite_links(
    md: &str,
    base_url: Option<&Url>,
    url_mapping: Option<&BTreeMap<String, String>>,
) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in md.split('\n') {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push(line.to_string());
            continue;
        }
        if in_fence {
            out.push(line.to_string());
            continue;
        }
        out.push(rewrite_line_links(line, base, url_mapping));
    }

    out.join("\n")
}

fn rewrite_line_links(
    line: &str,
    base: &Url,
    url_mapping: Option<&BTreeMap<String, String>>,
) -> String {
    LINK_RE
        .replace_all(line, |caps: &regex::Captures| {
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let text = &caps[1];
            let href = &caps[2];

            // Image links keep their source.
            if start > 0 && line.as_bytes()[start - 1] == b'!' {
                return caps[0].to_string();
            }
            if href.starts_with('#') || href.starts_with("mailto:") {
                return caps[0].to_string();
            }

            let Ok(resolved) = base.join(href) else {
                return caps[0].to_string();
            };

            let mut lookup = resolved.clone();
            lookup.set_fragment(None);
            lookup.set_query(None);

            if let Some(local) = url_mapping.and_then(|m| m.get(lookup.as_str())) {
                format!("[{text}]({local})")
            } else {
                format!("[{text}]({resolved})")
            }
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
