//! Navigation page generation.
//!
//! Builds the root `README.md`, a depth-ordered `NAVIGATION.md` site map,
//! and a `README.md` per subfolder so the mirrored tree can be browsed
//! without the original site.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, info, instrument};
use url::Url;

use docmirror_shared::{PageRecord, Result};

use crate::assembler::write_document;

/// Map of folder (`"."` for the root) to the Markdown files inside it.
fn folder_structure(url_mapping: &BTreeMap<String, String>) -> BTreeMap<String, Vec<String>> {
    let mut folders: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for local_path in url_mapping.values() {
        let (folder, file) = match local_path.rsplit_once('/') {
            Some((folder, file)) => (folder.to_string(), file.to_string()),
            None => (".".to_string(), local_path.clone()),
        };
        folders.entry(folder).or_default().push(file);
    }

    for files in folders.values_mut() {
        files.sort();
    }

    folders
}

/// Display title derived from a Markdown filename.
fn title_from_filename(file: &str) -> String {
    let stem = file.trim_end_matches(".md");
    if stem.eq_ignore_ascii_case("index") {
        return "Home".to_string();
    }

    stem.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Page builders
// ---------------------------------------------------------------------------

/// Root README: source info, folder tree, statistics.
fn root_readme(root_url: &Url, url_mapping: &BTreeMap<String, String>, max_depth: u32) -> String {
    let domain = root_url.authority();
    let depth_display = if max_depth == 0 {
        "Unlimited".to_string()
    } else {
        max_depth.to_string()
    };

    let mut lines = vec![
        "# Documentation Mirror".to_string(),
        String::new(),
        format!("*Mirrored from: [{root_url}]({root_url})*"),
        String::new(),
        format!("**Domain:** {domain}"),
        format!("**Total Pages:** {}", url_mapping.len()),
        format!("**Crawl Depth:** {depth_display}"),
        String::new(),
        "## Folder Structure".to_string(),
        String::new(),
    ];

    let folders = folder_structure(url_mapping);
    for (folder, files) in &folders {
        if folder == "." {
            lines.push("### Root Directory".to_string());
        } else {
            lines.push(format!("### {}", title_from_filename(folder)));
        }

        for file in files {
            let link = if folder == "." {
                file.clone()
            } else {
                format!("{folder}/{file}")
            };
            lines.push(format!("- [{}]({link})", title_from_filename(file)));
        }
        lines.push(String::new());
    }

    lines.extend([
        "## Notes".to_string(),
        String::new(),
        "- Internal links point to the local Markdown files".to_string(),
        "- Original URLs are preserved in each file's header comment".to_string(),
        "- The folder layout mirrors the original site hierarchy".to_string(),
        String::new(),
        format!("*Generated: {}*", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
    ]);

    lines.join("\n")
}

/// Site map grouped by crawl depth, one entry per page.
fn navigation_tree(
    root_url: &Url,
    pages: &[PageRecord],
    url_mapping: &BTreeMap<String, String>,
) -> String {
    let mut lines = vec![
        "# Navigation Tree".to_string(),
        String::new(),
        format!("*Mirrored from: {root_url}*"),
        String::new(),
    ];

    let mut by_depth: BTreeMap<u32, Vec<&PageRecord>> = BTreeMap::new();
    for page in pages {
        by_depth.entry(page.depth).or_default().push(page);
    }

    for (depth, mut depth_pages) in by_depth {
        lines.push(format!("## Level {depth}"));
        lines.push(String::new());

        depth_pages.sort_by(|a, b| a.url.cmp(&b.url));
        for page in depth_pages {
            let Some(local) = url_mapping.get(&page.url) else {
                continue;
            };
            lines.push(format!("- [{}]({local})", page.title));
            lines.push(format!("  - URL: {}", page.url));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Per-folder README listing the folder's documents with their source URLs.
fn folder_readme(
    folder: &str,
    files: &[String],
    reverse_mapping: &BTreeMap<String, String>,
    root_url: &Url,
) -> String {
    let mut lines = vec![
        format!("# {}", title_from_filename(folder)),
        String::new(),
        format!("*Mirrored from: {root_url}*"),
        String::new(),
        "## Contents".to_string(),
        String::new(),
    ];

    for file in files {
        let local_path = format!("{folder}/{file}");
        let source = reverse_mapping
            .get(&local_path)
            .map(String::as_str)
            .unwrap_or("unknown");
        lines.push(format!(
            "- [{}]({file}) - *{source}*",
            title_from_filename(file)
        ));
    }

    lines.extend([
        String::new(),
        "## Navigation".to_string(),
        String::new(),
        "[← Back to Root](../README.md)".to_string(),
    ]);

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Write README.md, NAVIGATION.md, and per-folder READMEs.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn write_navigation(
    output_dir: &Path,
    root_url: &Url,
    pages: &[PageRecord],
    url_mapping: &BTreeMap<String, String>,
    max_depth: u32,
) -> Result<()> {
    info!("generating navigation pages");

    let readme = root_readme(root_url, url_mapping, max_depth);
    write_document(output_dir, "README.md", &readme)?;

    let tree = navigation_tree(root_url, pages, url_mapping);
    write_document(output_dir, "NAVIGATION.md", &tree)?;

    let reverse_mapping: BTreeMap<String, String> = url_mapping
        .iter()
        .map(|(url, path)| (path.clone(), url.clone()))
        .collect();

    for (folder, files) in folder_structure(url_mapping) {
        if folder == "." {
            continue;
        }
        let readme = folder_readme(&folder, &files, &reverse_mapping, root_url);
        write_document(output_dir, &format!("{folder}/README.md"), &readme)?;
        debug!(folder = %folder, "wrote folder README");
    }

    Ok(())
}
