//! Document assembler.
//!
//! Maps crawled URLs onto a local Markdown file tree mirroring the site's
//! path hierarchy, and writes converted documents to disk.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};
use url::Url;

use docmirror_shared::{DocMirrorError, PageRecord, Result};

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[a-zA-Z0-9]+$").expect("valid regex"));
static UNSAFE_CHAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\-_]").expect("valid regex"));
static UNDERSCORE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("valid regex"));

/// Derive a filename stem from the last path segment of a URL.
///
/// The root URL (or any path ending in `/`) becomes `index`. File
/// extensions are dropped and anything outside `[a-zA-Z0-9-_]` becomes an
/// underscore, capped at 100 characters.
pub fn filename_from_url(url: &Url) -> String {
    let path = url.path().trim_matches('/');

    let Some(last) = path.split('/').next_back().filter(|s| !s.is_empty()) else {
        return "index".to_string();
    };

    let stem = EXTENSION_RE.replace(last, "");
    let safe = UNSAFE_CHAR_RE.replace_all(&stem, "_");
    let safe = UNDERSCORE_RUN_RE.replace_all(&safe, "_");
    let safe = safe.trim_matches('_');

    let mut name: String = safe.chars().take(100).collect();
    if name.is_empty() {
        name = "index".to_string();
    }
    name
}

/// Sanitize a folder path: unsafe characters become underscores, runs
/// collapse, separators survive.
pub fn sanitize_path(path: &str) -> String {
    let safe: String = path
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '/' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let safe = UNDERSCORE_RUN_RE.replace_all(&safe, "_");
    safe.trim_matches('_').to_string()
}

/// Local file path (relative, forward slashes) for a crawled URL.
fn local_path_for(url: &Url) -> String {
    let filename = filename_from_url(url);
    let path = url.path().trim_matches('/');

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 1 {
        let folder = sanitize_path(&segments[..segments.len() - 1].join("/"));
        if !folder.is_empty() {
            return format!("{folder}/{filename}.md");
        }
    }

    format!("{filename}.md")
}

/// Build the URL-to-local-path mapping for a set of crawled pages.
///
/// Paths are unique: when two URLs collapse onto the same file, later
/// ones get a numeric suffix. Iteration order is the crawl's visit order,
/// so suffix assignment is deterministic.
pub fn build_url_mapping(pages: &[PageRecord]) -> BTreeMap<String, String> {
    let mut mapping = BTreeMap::new();
    let mut taken: BTreeMap<String, usize> = BTreeMap::new();

    for page in pages {
        let Ok(url) = Url::parse(&page.url) else {
            continue;
        };
        let base = local_path_for(&url);

        let count = taken.entry(base.clone()).or_insert(0);
        *count += 1;
        let path = if *count == 1 {
            base
        } else {
            let stem = base.trim_end_matches(".md");
            format!("{stem}_{count}.md")
        };

        debug!(url = %page.url, path = %path, "mapped page");
        mapping.insert(page.url.clone(), path);
    }

    mapping
}

/// Write one converted document at its mapped location under `output_dir`.
pub fn write_document(output_dir: &Path, local_path: &str, markdown: &str) -> Result<()> {
    let file_path = output_dir.join(local_path);

    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DocMirrorError::io(parent, e))?;
    }

    std::fs::write(&file_path, markdown).map_err(|e| DocMirrorError::io(&file_path, e))?;
    debug!(path = %file_path.display(), "wrote document");
    Ok(())
}

/// Create the output directory.
#[instrument(skip_all, fields(dir = %output_dir.display()))]
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir).map_err(|e| DocMirrorError::io(output_dir, e))?;
    info!("output directory ready");
    Ok(())
}
