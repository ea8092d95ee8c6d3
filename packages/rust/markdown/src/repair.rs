//! Markdown repair passes.
//!
//! HTML-to-Markdown converters degrade on highlighter markup: they emit
//! empty fence pairs with the code stranded below them, drop leading
//! lines, or fall back to legacy `[code]` delimiters. Each pass here is a
//! total text-to-text transformation fixing one of those artifacts, and no
//! pass assumes any other pass ran before it.
//!
//! [`repair`] runs the passes in their fixed order, driven by
//! [`RepairOptions`]. Raw mode skips the content-altering repairs but
//! still normalizes fence syntax and blank lines.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use docmirror_shared::{OptimizationLevel, RepairOptions};

/// Run the full repair pipeline over converter output.
pub fn repair(markdown: &str, opts: &RepairOptions) -> String {
    let mut text = markdown.to_string();

    if !opts.raw {
        text = fix_empty_fences(&text);
        text = fix_orphaned_fence_content(&text);
        if opts.reconstruct_leading_lines {
            text = reconstruct_missing_leading_lines(&text);
        }
    }

    if opts.force_fences {
        text = force_fence_syntax(&text);
    }

    if !opts.raw {
        text = structural_cleanup(&text);
    }

    if opts.reduce_empty_lines {
        text = reduce_empty_lines(&text);
    }

    apply_optimization(&text, opts.level)
}

/// A line that is exactly a bare fence marker, modulo surrounding whitespace.
fn is_bare_fence(line: &str) -> bool {
    line.trim() == "```"
}

/// A line that opens or closes any fence (bare or language-tagged).
fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

// ---------------------------------------------------------------------------
// Pass 1: empty fence pairs
// ---------------------------------------------------------------------------

/// Repair degenerate empty fence pairs.
///
/// Converters that lose track of `<pre><code>` structure emit an
/// open-close pair with zero content, with the real code stranded after
/// the closing fence:
///
/// ````text
/// ```
/// ```
/// adk --version
/// ```
/// ````
///
/// The stranded content is spliced back between the pair; a pair with no
/// trailing content is deleted outright. Applied to fixpoint, so the
/// result contains no adjacent bare fence lines and a second run is a
/// no-op.
pub fn fix_empty_fences(markdown: &str) -> String {
    let mut current = markdown.to_string();
    loop {
        let next = rehome_stranded_fence_content(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Repair empty fence pairs whose content never got a terminating fence.
///
/// Same normalization as [`fix_empty_fences`]; running it on already
/// repaired text is a no-op. Kept as its own pipeline step so the repair
/// stays safe when the first pass is skipped.
pub fn fix_orphaned_fence_content(markdown: &str) -> String {
    fix_empty_fences(markdown)
}

/// One splice pass over the line list.
fn rehome_stranded_fence_content(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut fixed: Vec<String> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if is_bare_fence(lines[i]) && i + 1 < lines.len() && is_bare_fence(lines[i + 1]) {
            // Stranded content runs from past the pair to the next fence
            // line (or end of document).
            let mut content: Vec<String> = Vec::new();
            let mut j = i + 2;
            while j < lines.len() && !is_bare_fence(lines[j]) {
                if !lines[j].trim().is_empty() {
                    content.push(lines[j].to_string());
                }
                j += 1;
            }

            if content.is_empty() {
                debug!(line = i, "removing empty fence pair");
                i += 2;
            } else {
                debug!(line = i, content_lines = content.len(), "rehoming stranded fence content");
                fixed.push("```".to_string());
                fixed.append(&mut content);
                fixed.push("```".to_string());
                // j sits on the trailing fence when one existed.
                i = if j < lines.len() { j + 1 } else { j };
            }
        } else {
            fixed.push(lines[i].to_string());
            i += 1;
        }
    }

    fixed.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: missing leading lines
// ---------------------------------------------------------------------------

/// Recognized shapes for the first content line of a code block.
///
/// When the converter drops a block's opening line, the surviving first
/// line usually still betrays what kind of block it was. This is a closed
/// classification; anything unrecognized stays untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeadingPattern {
    /// `KEY=value` where the key names a credential-like token.
    CredentialAssignment,
    /// A shell command invocation.
    ShellCommand,
    /// An import/using/require statement.
    ImportStatement,
    /// A class or function declaration.
    Declaration,
    /// A `main` entry point.
    EntryPoint,
}

/// Credential-like tokens inside an assignment key.
const CREDENTIAL_TOKENS: &[&str] = &["KEY", "TOKEN", "SECRET", "API", "PASSWORD"];

/// Shell command prefixes.
const SHELL_PREFIXES: &[&str] = &[
    "$ ", "sudo ", "pip ", "pip3 ", "npm ", "npx ", "yarn ", "cargo ", "git ", "curl ", "wget ",
    "docker ", "make ", "adk ",
];

fn classify_leading_line(line: &str) -> Option<LeadingPattern> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some((key, _)) = trimmed.split_once('=') {
        let key = key.trim();
        let env_shaped = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if env_shaped && CREDENTIAL_TOKENS.iter().any(|t| key.contains(t)) {
            return Some(LeadingPattern::CredentialAssignment);
        }
    }

    if trimmed.starts_with("import ")
        || trimmed.starts_with("from ")
        || trimmed.starts_with("using ")
        || trimmed.starts_with("require(")
        || trimmed.starts_with("#include ")
    {
        return Some(LeadingPattern::ImportStatement);
    }

    // Entry points win over the general declaration shapes they share.
    if trimmed.starts_with("def main")
        || trimmed.contains("fn main(")
        || trimmed.contains("public static void main")
        || trimmed.starts_with("if __name__")
    {
        return Some(LeadingPattern::EntryPoint);
    }

    if trimmed.starts_with("class ")
        || trimmed.starts_with("def ")
        || trimmed.starts_with("function ")
        || trimmed.starts_with("fn ")
        || trimmed.starts_with("pub fn ")
    {
        return Some(LeadingPattern::Declaration);
    }

    if SHELL_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return Some(LeadingPattern::ShellCommand);
    }

    None
}

/// Placeholder inserted for a dropped leading line.
///
/// The real line is gone; fabricating a concrete value (an invented
/// environment variable, a guessed command) would corrupt the document.
/// Every placeholder is a comment and carries "(reconstructed)" so it is
/// attributable.
fn leading_placeholder(pattern: LeadingPattern) -> &'static str {
    match pattern {
        LeadingPattern::CredentialAssignment => {
            "# preceding configuration line omitted by source (reconstructed)"
        }
        LeadingPattern::ShellCommand => "# preceding command omitted by source (reconstructed)",
        LeadingPattern::ImportStatement => "# preceding import omitted by source (reconstructed)",
        LeadingPattern::Declaration => {
            "# preceding declaration omitted by source (reconstructed)"
        }
        LeadingPattern::EntryPoint => "# preceding setup omitted by source (reconstructed)",
    }
}

/// Insert a placeholder where a code block's opening line appears dropped.
///
/// Heuristic and opt-in. Inspects the first content line after each bare
/// fence open; on a recognized [`LeadingPattern`], a clearly marked
/// placeholder comment goes above it. Blocks already starting with a
/// placeholder are left alone, so the pass is idempotent.
pub fn reconstruct_missing_leading_lines(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut fixed: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_fence = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        fixed.push(line.to_string());

        if is_fence_line(line) {
            if !in_fence {
                in_fence = true;
                if i + 1 < lines.len()
                    && !is_fence_line(lines[i + 1])
                    && !lines[i + 1].trim_start().starts_with('#')
                {
                    if let Some(pattern) = classify_leading_line(lines[i + 1]) {
                        debug!(?pattern, "inserting reconstructed leading line");
                        fixed.push(leading_placeholder(pattern).to_string());
                    }
                }
            } else {
                in_fence = false;
            }
        }

        i += 1;
    }

    fixed.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: legacy fence syntax
// ---------------------------------------------------------------------------

static CODE_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[code\](.*?)\[/code\]").expect("valid regex"));
static CODE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[code\]").expect("valid regex"));

/// Rewrite legacy `[code]...[/code]` delimiters into backtick fences.
///
/// Paired delimiters become a fence pair with the enclosed text unchanged;
/// an unterminated `[code]` becomes a bare fence; a stray `[/code]` is
/// removed. No-op on text already using fence syntax only.
///
/// Each emitted fence goes on its own line, so the later line-oriented
/// passes see a well-formed open/close pair even when the legacy
/// delimiters were inline.
pub fn force_fence_syntax(markdown: &str) -> String {
    if !markdown.contains("[code]") && !markdown.contains("[/code]") {
        return markdown.to_string();
    }

    debug!("rewriting legacy code delimiters");
    let text = CODE_PAIR_RE.replace_all(markdown, |caps: &regex::Captures| {
        let content = caps[1].trim_matches('\n');
        if content.is_empty() {
            "```\n```".to_string()
        } else {
            format!("```\n{content}\n```")
        }
    });
    let text = CODE_OPEN_RE.replace_all(&text, "```");
    text.replace("[/code]", "")
}

// ---------------------------------------------------------------------------
// Pass 4: structural cleanup
// ---------------------------------------------------------------------------

static HEADING_SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s*(\S.*)$").expect("valid regex"));
static DASH_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*[-+])([A-Za-z0-9])").expect("valid regex"));
static ORDERED_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*\d+\.)(\S)").expect("valid regex"));

/// Normalize document structure: blank-line runs collapse to one, heading
/// and list markers get their space, trailing blank lines go.
///
/// Fence interiors are left untouched.
pub fn structural_cleanup(markdown: &str) -> String {
    let mut cleaned: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in markdown.split('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
            cleaned.push(line.to_string());
            continue;
        }
        if in_fence {
            cleaned.push(line.to_string());
            continue;
        }

        if line.trim().is_empty() && cleaned.last().is_some_and(|prev| prev.trim().is_empty()) {
            continue;
        }

        let line = HEADING_SPACING_RE.replace(line, "$1 $2");
        let line = DASH_LIST_RE.replace(&line, "$1 $2");
        let line = ORDERED_LIST_RE.replace(&line, "$1 $2");
        cleaned.push(line.into_owned());
    }

    while cleaned.last().is_some_and(|l| l.trim().is_empty()) {
        cleaned.pop();
    }

    cleaned.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: blank-line reduction
// ---------------------------------------------------------------------------

/// Collapse every run of blank lines to a single blank line, globally,
/// fence interiors included.
pub fn reduce_empty_lines(markdown: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut prev_blank = false;

    for line in markdown.split('\n') {
        let blank = line.trim().is_empty();
        if blank && prev_blank {
            continue;
        }
        prev_blank = blank;
        out.push(line);
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Optimization levels
// ---------------------------------------------------------------------------

/// Language tag keywords checked against a fence line's own text.
/// Longest keywords first so `json` does not read as `js`.
const FENCE_HINT_LANGUAGES: &[(&str, &str)] = &[
    ("javascript", "javascript"),
    ("python", "python"),
    ("shell", "bash"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("bash", "bash"),
    ("html", "html"),
    ("java", "java"),
    ("yml", "yaml"),
    ("xml", "xml"),
    ("css", "css"),
    ("js", "javascript"),
    ("py", "python"),
];

/// Guess a language tag from the fence line's own text.
fn language_from_fence_hint(fence_line: &str) -> Option<&'static str> {
    let lower = fence_line.to_lowercase();
    FENCE_HINT_LANGUAGES
        .iter()
        .find(|(kw, _)| lower.contains(kw))
        .map(|(_, tag)| *tag)
}

/// Guess a language tag from the lexical shape of a block's first line.
fn language_from_content(first_line: &str) -> Option<&'static str> {
    let t = first_line.trim();

    if SHELL_PREFIXES.iter().any(|p| t.starts_with(p)) || t.starts_with("export ") {
        return Some("bash");
    }
    if let Some((key, _)) = t.split_once('=') {
        let key = key.trim();
        if !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            return Some("bash");
        }
    }
    if t.starts_with("<?xml") {
        return Some("xml");
    }
    if t.starts_with('<') {
        return Some("html");
    }
    if t.starts_with('{') || t.starts_with("[{") {
        return Some("json");
    }
    if t.starts_with("function ")
        || t.starts_with("const ")
        || t.starts_with("let ")
        || t.contains("=>")
    {
        return Some("javascript");
    }
    if t.starts_with("import ")
        || t.starts_with("from ")
        || t.starts_with("def ")
        || t.starts_with("print(")
    {
        return Some("python");
    }
    if t.starts_with("public class") || t.starts_with("public static") {
        return Some("java");
    }
    if t.starts_with("fn ") || t.starts_with("pub fn ") || t.starts_with("use ") {
        return Some("rust");
    }
    if (t.starts_with('.') || t.starts_with('#')) && t.ends_with('{') {
        return Some("css");
    }

    None
}

/// Marker prefix for semantic annotation comments.
const ANNOTATION_PREFIX: &str = "<!-- sem:";

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*<!-- sem:[^>]*-->").expect("valid regex"));
static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"  +").expect("valid regex"));
static DEEP_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{7,}").expect("valid regex"));
static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)[*+] ").expect("valid regex"));
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").expect("valid regex"));

/// Apply one of the mutually exclusive AI output-shaping strategies.
pub fn apply_optimization(markdown: &str, level: OptimizationLevel) -> String {
    match level {
        OptimizationLevel::Minimal => normalize_fence_lines(markdown),
        OptimizationLevel::Standard => tag_fences(markdown, language_from_fence_hint),
        OptimizationLevel::Enhanced => {
            let tagged = tag_fences_from_content(markdown);
            annotate_structure(&tagged)
        }
        OptimizationLevel::TokenOptimized => minify(markdown),
    }
}

/// Minimal: a bare fence line is exactly three backticks, nothing else.
fn normalize_fence_lines(markdown: &str) -> String {
    markdown
        .split('\n')
        .map(|line| if is_bare_fence(line) { "```" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Standard: tag fence-open lines using a hint drawn from the line itself.
fn tag_fences(markdown: &str, guess: impl Fn(&str) -> Option<&'static str>) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_fence = false;

    for (i, line) in lines.iter().enumerate() {
        if is_fence_line(line) {
            if !in_fence {
                in_fence = true;
                let opens_populated_block = i + 1 < lines.len() && !is_fence_line(lines[i + 1]);
                if opens_populated_block {
                    if let Some(tag) = guess(line) {
                        out.push(format!("```{tag}"));
                        continue;
                    }
                }
            } else {
                in_fence = false;
            }
        }
        out.push(line.to_string());
    }

    out.join("\n")
}

/// Enhanced: tag fence-open lines from the first content line's shape.
fn tag_fences_from_content(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_fence = false;

    for (i, line) in lines.iter().enumerate() {
        if is_fence_line(line) {
            if !in_fence {
                in_fence = true;
                let opens_populated_block = i + 1 < lines.len() && !is_fence_line(lines[i + 1]);
                if opens_populated_block && is_bare_fence(line) {
                    if let Some(tag) = language_from_content(lines[i + 1]) {
                        out.push(format!("```{tag}"));
                        continue;
                    }
                }
            } else {
                in_fence = false;
            }
        }
        out.push(line.to_string());
    }

    out.join("\n")
}

/// Enhanced: append a semantic-role comment after headings, list items,
/// and lines carrying inline-code spans. Fence interiors are skipped.
fn annotate_structure(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in markdown.split('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
            out.push(line.to_string());
            continue;
        }
        if in_fence || line.contains(ANNOTATION_PREFIX) {
            out.push(line.to_string());
            continue;
        }

        let trimmed = line.trim_start();
        if let Some(stripped) = trimmed.strip_prefix('#') {
            let level = 1 + stripped.chars().take_while(|&c| c == '#').count();
            out.push(format!("{line} {ANNOTATION_PREFIX} heading-{level} -->"));
        } else if DASH_LIST_RE.is_match(line)
            || trimmed.starts_with("- ")
            || trimmed.starts_with("* ")
            || ORDERED_LIST_RE.is_match(line)
        {
            out.push(format!("{line} {ANNOTATION_PREFIX} list-item -->"));
        } else if INLINE_CODE_RE.is_match(line) {
            out.push(format!("{line} {ANNOTATION_PREFIX} inline-code -->"));
        } else {
            out.push(line.to_string());
        }
    }

    out.join("\n")
}

/// Token-optimized: aggressive minification outside fences.
fn minify(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for line in markdown.split('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
            out.push(line.trim().to_string());
            continue;
        }
        if in_fence {
            out.push(line.to_string());
            continue;
        }

        let line = ANNOTATION_RE.replace_all(line, "");
        let line = line.trim();
        let line = MULTI_SPACE_RE.replace_all(line, " ");
        let line = collapse_repeated_punctuation(&line);
        let line = DEEP_HEADING_RE.replace(&line, "######");
        let line = LIST_MARKER_RE.replace(&line, "${1}- ");
        out.push(line.into_owned());
    }

    // Blank runs collapse a second time; minification may have produced
    // new empty lines.
    reduce_empty_lines(&out.join("\n"))
}

/// Collapse a run of the same punctuation character to one occurrence.
/// Mixed runs (`?!`) are kept as written.
fn collapse_repeated_punctuation(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut prev: Option<char> = None;

    for c in line.chars() {
        if matches!(c, '!' | '?' | '.' | ',' | ';' | ':') && prev == Some(c) {
            continue;
        }
        out.push(c);
        prev = Some(c);
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
