//! URL normalization and crawl-scope decisions.
//!
//! Pure functions over an immutable [`CrawlScope`]: no I/O, no side effects.
//! A URL is eligible for fetching iff it is in scope AND not excluded;
//! exclusion always wins.

use url::Url;

/// Normalize a URL for deduplication and exclusion matching.
///
/// Removes the fragment and query string; everything else is left intact.
/// Normalization is idempotent: re-parsing and re-normalizing the result
/// yields the same string.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.set_query(None);
    normalized.to_string()
}

/// Determines which URLs are in scope for a crawl.
///
/// Scope is the root URL's authority plus its path prefix; exclusion
/// patterns are normalized URLs matched exactly or as path prefixes.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    /// Authority (host + port) URLs must match.
    authority: String,
    /// Base path prefix, with any trailing slash trimmed ("" for root).
    base_path: String,
    /// Normalized exclusion patterns.
    exclude_patterns: Vec<String>,
}

impl CrawlScope {
    /// Build a scope from the crawl root and the configured exclude list.
    ///
    /// Exclude entries that are not valid URLs are kept as given: the
    /// prefix rules below still apply to them verbatim.
    pub fn new(root: &Url, exclude_urls: &[String]) -> Self {
        let base_path = root.path().trim_end_matches('/').to_string();

        let exclude_patterns = exclude_urls
            .iter()
            .map(|raw| match Url::parse(raw) {
                Ok(url) => normalize_url(&url),
                Err(_) => raw.clone(),
            })
            .collect();

        Self {
            authority: root.authority().to_string(),
            base_path,
            exclude_patterns,
        }
    }

    /// Whether `url` belongs to the crawl scope.
    ///
    /// In scope iff the authority matches the root's AND the path is the
    /// base path itself or nested under it. `/guide` is in scope for a
    /// root of `/guide/`, but `/guidebook` is not.
    pub fn in_scope(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        if url.authority() != self.authority {
            return false;
        }

        if self.base_path.is_empty() {
            return true;
        }

        let path = url.path();
        path == self.base_path || path.starts_with(&format!("{}/", self.base_path))
    }

    /// Whether a normalized URL matches an exclusion pattern.
    ///
    /// A URL is excluded if it equals a pattern exactly, or if the pattern
    /// is a directory prefix of it. Excluding `.../api` covers `.../api`
    /// and `.../api/x` but never `.../apiary`.
    pub fn is_excluded(&self, normalized_url: &str) -> bool {
        for pattern in &self.exclude_patterns {
            if normalized_url == pattern {
                return true;
            }
            if pattern.ends_with('/') && normalized_url.starts_with(pattern.as_str()) {
                return true;
            }
            if !pattern.ends_with('/') && normalized_url.starts_with(&format!("{pattern}/")) {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(root: &str, excludes: &[&str]) -> CrawlScope {
        let root = Url::parse(root).expect("valid root URL");
        let excludes: Vec<String> = excludes.iter().map(|s| s.to_string()).collect();
        CrawlScope::new(&root, &excludes)
    }

    #[test]
    fn normalize_strips_fragment_and_query() {
        let url = Url::parse("https://docs.example.com/guide?version=2#install").unwrap();
        assert_eq!(normalize_url(&url), "https://docs.example.com/guide");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "https://docs.example.com/guide?x=1#frag",
            "https://docs.example.com/",
            "https://docs.example.com/a/b/c.html",
        ];
        for input in inputs {
            let once = normalize_url(&Url::parse(input).unwrap());
            let twice = normalize_url(&Url::parse(&once).unwrap());
            assert_eq!(once, twice, "normalization not idempotent for {input}");
        }
    }

    #[test]
    fn query_and_fragment_never_affect_equality() {
        let a = Url::parse("https://docs.example.com/guide?a=1").unwrap();
        let b = Url::parse("https://docs.example.com/guide#section-2").unwrap();
        assert_eq!(normalize_url(&a), normalize_url(&b));
    }

    #[test]
    fn in_scope_requires_matching_authority() {
        let s = scope("https://docs.example.com/guide/", &[]);
        assert!(s.in_scope(&Url::parse("https://docs.example.com/guide/intro").unwrap()));
        assert!(!s.in_scope(&Url::parse("https://other.example.com/guide/intro").unwrap()));
        assert!(!s.in_scope(&Url::parse("https://docs.example.com:8443/guide/intro").unwrap()));
    }

    #[test]
    fn base_path_boundary_is_a_path_segment() {
        let s = scope("https://x.example.com/a/", &[]);
        assert!(s.in_scope(&Url::parse("https://x.example.com/a").unwrap()));
        assert!(s.in_scope(&Url::parse("https://x.example.com/a/b").unwrap()));
        assert!(!s.in_scope(&Url::parse("https://x.example.com/ab").unwrap()));
    }

    #[test]
    fn root_base_path_admits_all_paths() {
        let s = scope("https://docs.example.com/", &[]);
        assert!(s.in_scope(&Url::parse("https://docs.example.com/anything/here").unwrap()));
    }

    #[test]
    fn non_http_schemes_are_out_of_scope() {
        let s = scope("https://docs.example.com/", &[]);
        assert!(!s.in_scope(&Url::parse("ftp://docs.example.com/file").unwrap()));
        assert!(!s.in_scope(&Url::parse("mailto:someone@example.com").unwrap()));
    }

    #[test]
    fn exclusion_exact_match() {
        let s = scope(
            "https://docs.example.com/",
            &["https://docs.example.com/changelog"],
        );
        assert!(s.is_excluded("https://docs.example.com/changelog"));
        assert!(!s.is_excluded("https://docs.example.com/guide"));
    }

    #[test]
    fn exclusion_prefix_semantics() {
        let s = scope("https://docs.example.com/", &["https://docs.example.com/api/"]);
        assert!(s.is_excluded("https://docs.example.com/api/"));
        assert!(s.is_excluded("https://docs.example.com/api/client"));
        assert!(!s.is_excluded("https://docs.example.com/apiary"));
    }

    #[test]
    fn exclusion_without_trailing_slash_still_covers_children() {
        let s = scope("https://docs.example.com/", &["https://docs.example.com/api"]);
        assert!(s.is_excluded("https://docs.example.com/api"));
        assert!(s.is_excluded("https://docs.example.com/api/client"));
        assert!(!s.is_excluded("https://docs.example.com/apiary"));
    }

    #[test]
    fn exclusion_patterns_are_normalized() {
        let s = scope(
            "https://docs.example.com/",
            &["https://docs.example.com/api?beta=1#top"],
        );
        assert!(s.is_excluded("https://docs.example.com/api"));
    }

    #[test]
    fn in_scope_and_excluded_can_both_hold() {
        // Exclusion is independent of scope; the caller lets exclusion win.
        let s = scope("https://docs.example.com/", &["https://docs.example.com/api"]);
        let url = Url::parse("https://docs.example.com/api/client").unwrap();
        assert!(s.in_scope(&url));
        assert!(s.is_excluded(&normalize_url(&url)));
    }
}
