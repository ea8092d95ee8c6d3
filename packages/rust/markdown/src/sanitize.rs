//! HTML sanitization ahead of Markdown conversion.
//!
//! Two passes over the document:
//! - [`clean`] strips page chrome (scripts, navigation, ads) while keeping
//!   every code-bearing element intact.
//! - [`normalize_for_conversion`] rewrites highlighter-wrapped code blocks
//!   into the bare `<pre><code>` shape the downstream converter recognizes.
//!
//! Both work on the serialized document and remove elements by replacing
//! their outer HTML, the same technique used for table preprocessing.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Class keywords marking page chrome to strip (case-insensitive substring).
const CHROME_CLASS_KEYWORDS: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "footer",
    "header",
    "breadcrumb",
    "advertisement",
    "ads",
    "social-share",
    "related-posts",
];

/// Class keywords marking a syntax-highlighter code container.
const CODE_CONTAINER_KEYWORDS: &[&str] = &["language", "highlight", "code", "syntax"];

/// Whether a class attribute marks an element as page chrome.
fn is_chrome_class(class_attr: &str) -> bool {
    let lower = class_attr.to_lowercase();
    CHROME_CLASS_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Whether a class attribute marks an element as a code-sample container.
fn is_code_container_class(class_attr: &str) -> bool {
    let lower = class_attr.to_lowercase();
    CODE_CONTAINER_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Whether an element holds (directly or via descendants) non-empty code.
fn contains_code_sample(el: &ElementRef) -> bool {
    for sel_str in ["pre", "code"] {
        if let Ok(selector) = Selector::parse(sel_str) {
            for code_el in el.select(&selector) {
                if !code_el.text().collect::<String>().trim().is_empty() {
                    return true;
                }
            }
        }
    }

    let name = el.value().name();
    if name == "pre" || name == "code" {
        return !el.text().collect::<String>().trim().is_empty();
    }

    false
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Strip non-content markup, preserving anything code-bearing.
pub fn clean(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut result = doc.html();

    // Structural chrome elements go first.
    for tag in ["script", "style", "nav", "footer", "header"] {
        if let Ok(selector) = Selector::parse(tag) {
            for el in doc.select(&selector) {
                result = result.replacen(&el.html(), "", 1);
            }
        }
    }

    // Chrome-classed elements, unless they carry a code sample.
    if let Ok(selector) = Selector::parse("[class]") {
        for el in doc.select(&selector) {
            let Some(class_attr) = el.value().attr("class") else {
                continue;
            };
            if is_chrome_class(class_attr) && !contains_code_sample(&el) {
                result = result.replacen(&el.html(), "", 1);
            }
        }
    }

    // Empty code containers carry no information.
    result = drop_empty_code_elements(&doc, result);

    // Structurally-empty spans can break block recognition downstream.
    result = drop_empty_spans(&doc, result);

    result
}

fn drop_empty_code_elements(doc: &Html, mut result: String) -> String {
    if let Ok(pre_sel) = Selector::parse("pre") {
        for pre in doc.select(&pre_sel) {
            if pre.text().collect::<String>().trim().is_empty() {
                debug!("dropping empty pre element");
                result = result.replacen(&pre.html(), "", 1);
            }
        }
    }

    if let Ok(code_sel) = Selector::parse("code") {
        for code in doc.select(&code_sel) {
            if code.text().collect::<String>().trim().is_empty() {
                result = result.replacen(&code.html(), "", 1);
            }
        }
    }

    result
}

fn drop_empty_spans(doc: &Html, mut result: String) -> String {
    if let Ok(span_sel) = Selector::parse("span") {
        for span in doc.select(&span_sel) {
            let has_class = span.value().attr("class").is_some();
            let empty = span.text().collect::<String>().trim().is_empty();
            if empty && !has_class {
                result = result.replacen(&span.html(), "", 1);
            }
        }
    }

    result
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Rewrite highlighter-wrapped code blocks into bare `<pre><code>` form.
///
/// Highlighters emit deeply nested markup (line-number gutters, token
/// spans) that defeats converter code-block detection. Every container
/// whose class matches a code keyword and which holds a `<pre><code>`
/// with text is replaced by the minimal equivalent carrying the exact
/// original text. Containers with an empty `<pre><code>` are dropped.
pub fn normalize_for_conversion(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut result = doc.html();

    let Ok(container_sel) = Selector::parse("[class]") else {
        return result;
    };
    let Ok(pre_sel) = Selector::parse("pre") else {
        return result;
    };
    let Ok(code_sel) = Selector::parse("code") else {
        return result;
    };

    for el in doc.select(&container_sel) {
        let Some(class_attr) = el.value().attr("class") else {
            continue;
        };
        if !is_code_container_class(class_attr) {
            continue;
        }
        // Skip the pre/code elements themselves; only rewrite wrappers.
        let name = el.value().name();
        if name == "pre" || name == "code" {
            continue;
        }

        let Some(pre) = el.select(&pre_sel).next() else {
            continue;
        };
        let Some(code) = pre.select(&code_sel).next() else {
            continue;
        };

        // Whitespace inside the code text is significant; only the outer
        // edges are trimmed.
        let code_text = code.text().collect::<String>();
        let code_text = code_text.trim_matches('\n');

        if code_text.trim().is_empty() {
            debug!(class = class_attr, "dropping container with empty code block");
            result = result.replacen(&el.html(), "", 1);
        } else {
            let minimal = format!("<pre><code>{}</code></pre>", escape_html(code_text));
            result = result.replacen(&el.html(), &minimal, 1);
        }
    }

    drop_empty_spans(&doc, result)
}

/// Escape text for embedding inside an HTML element.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_removes_scripts_and_chrome_tags() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <script>track();</script>
            <main><p>Content stays.</p></main>
            <footer>Copyright</footer>
        </body></html>"#;

        let cleaned = clean(html);
        assert!(cleaned.contains("Content stays."));
        assert!(!cleaned.contains("track()"));
        assert!(!cleaned.contains("Copyright"));
        assert!(!cleaned.contains("<nav>"));
    }

    #[test]
    fn clean_removes_chrome_classed_elements() {
        let html = r#"<html><body>
            <div class="Sidebar-left"><a href="/x">Links</a></div>
            <div class="advertisement">Buy now</div>
            <div class="doc-body"><p>Real text.</p></div>
        </body></html>"#;

        let cleaned = clean(html);
        assert!(cleaned.contains("Real text."));
        assert!(!cleaned.contains("Buy now"));
        assert!(!cleaned.contains("Links"));
    }

    #[test]
    fn clean_keeps_chrome_classed_element_holding_code() {
        // "header" class keyword, but the element carries a code sample.
        let html = r#"<html><body>
            <div class="header-example"><pre><code>run --all</code></pre></div>
        </body></html>"#;

        let cleaned = clean(html);
        assert!(cleaned.contains("run --all"));
    }

    #[test]
    fn clean_drops_empty_pre_and_code() {
        let html = r#"<html><body>
            <pre><code>   </code></pre>
            <pre><code>real code</code></pre>
            <code></code>
        </body></html>"#;

        let cleaned = clean(html);
        assert!(cleaned.contains("real code"));
        assert!(!cleaned.contains("<pre><code>   </code></pre>"));
        assert!(!cleaned.contains("<code></code>"));
    }

    #[test]
    fn clean_drops_empty_unclassed_spans() {
        let html = r#"<html><body><p>Before<span></span>After</p></body></html>"#;
        let cleaned = clean(html);
        assert!(!cleaned.contains("<span></span>"));
        assert!(cleaned.contains("Before"));
        assert!(cleaned.contains("After"));
    }

    #[test]
    fn normalize_unwraps_highlighter_container() {
        let html = r#"<html><body>
            <div class="language-bash highlight"><pre><code><span>adk</span> <span>--version</span></code></pre></div>
        </body></html>"#;

        let normalized = normalize_for_conversion(html);
        assert!(normalized.contains("<pre><code>adk --version</code></pre>"));
        assert!(!normalized.contains("language-bash"));
    }

    #[test]
    fn normalize_preserves_multiline_code_text() {
        let html = concat!(
            r#"<html><body><div class="highlight"><pre><code>"#,
            "GOOGLE_GENAI_USE_VERTEXAI=0\nGOOGLE_API_KEY=abc123",
            r#"</code></pre></div></body></html>"#,
        );

        let normalized = normalize_for_conversion(html);
        assert!(normalized.contains("GOOGLE_GENAI_USE_VERTEXAI=0\nGOOGLE_API_KEY=abc123"));
    }

    #[test]
    fn normalize_escapes_html_in_code_text() {
        let html = r#"<html><body>
            <div class="language-rust"><pre><code>Vec&lt;String&gt;</code></pre></div>
        </body></html>"#;

        let normalized = normalize_for_conversion(html);
        assert!(normalized.contains("Vec&lt;String&gt;"));
    }

    #[test]
    fn normalize_drops_container_with_empty_code() {
        let html = r#"<html><body>
            <div class="code-sample"><pre><code>  </code></pre></div>
            <p>kept</p>
        </body></html>"#;

        let normalized = normalize_for_conversion(html);
        assert!(normalized.contains("kept"));
        assert!(!normalized.contains("code-sample"));
    }

    #[test]
    fn normalize_leaves_plain_pre_code_alone() {
        let html = r#"<html><body><pre><code>fn main() {}</code></pre></body></html>"#;
        let normalized = normalize_for_conversion(html);
        assert!(normalized.contains("fn main() {}"));
    }
}
