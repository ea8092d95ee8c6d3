//! Breadth-first crawl frontier.
//!
//! The frontier owns the traversal queue and the visited set. URLs move
//! through exactly two states: unseen and visited. Entries are popped in
//! FIFO order, which guarantees pages are visited in non-decreasing depth
//! order, and the depth recorded for a URL is always its first-seen depth.

use std::collections::{HashSet, VecDeque};

use url::Url;

use crate::scope::{CrawlScope, normalize_url};

/// A queued (URL, depth) pair. Created on link discovery, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// Normalized URL.
    pub url: String,
    /// Depth at which the URL was first discovered.
    pub depth: u32,
}

/// FIFO frontier with a monotonically growing visited set.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    visited: HashSet<String>,
    scope: CrawlScope,
    /// Maximum depth to enqueue (0 = unbounded).
    max_depth: u32,
}

impl Frontier {
    /// Create a frontier seeded with the crawl root at depth 0.
    pub fn new(root: &Url, scope: CrawlScope, max_depth: u32) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(FrontierEntry {
            url: normalize_url(root),
            depth: 0,
        });

        Self {
            queue,
            visited: HashSet::new(),
            scope,
            max_depth,
        }
    }

    /// Pop the next unvisited entry in FIFO order, or `None` when drained.
    ///
    /// Entries whose URL was visited after they were enqueued (a URL can be
    /// discovered via several paths) are skipped, not returned.
    pub fn next(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.queue.pop_front() {
            if !self.visited.contains(&entry.url) {
                return Some(entry);
            }
        }
        None
    }

    /// Offer a discovered link for future traversal.
    ///
    /// The entry is enqueued only if the URL has not been visited, is in
    /// scope, and is not excluded. The visited check runs before the depth
    /// cutoff, so a URL first seen at a shallow depth is never re-enqueued
    /// when rediscovered deeper. Entries past `max_depth` are dropped
    /// silently.
    pub fn offer(&mut self, url: &str, depth: u32) {
        if self.visited.contains(url) {
            return;
        }

        let Ok(parsed) = Url::parse(url) else {
            return;
        };
        if !self.scope.in_scope(&parsed) || self.scope.is_excluded(url) {
            return;
        }

        if self.max_depth > 0 && depth > self.max_depth {
            return;
        }

        self.queue.push_back(FrontierEntry {
            url: url.to_string(),
            depth,
        });
    }

    /// Record that a URL has been fetched (successfully or not). Idempotent.
    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    /// Number of URLs fetched so far.
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// The scope this frontier filters against.
    pub fn scope(&self) -> &CrawlScope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontier(root: &str, max_depth: u32) -> Frontier {
        let root = Url::parse(root).expect("valid root");
        let scope = CrawlScope::new(&root, &[]);
        Frontier::new(&root, scope, max_depth)
    }

    #[test]
    fn seeds_root_at_depth_zero() {
        let mut f = frontier("https://docs.example.com/", 0);
        let entry = f.next().expect("root entry");
        assert_eq!(entry.url, "https://docs.example.com/");
        assert_eq!(entry.depth, 0);
        assert!(f.next().is_none());
    }

    #[test]
    fn breadth_first_visit_order() {
        // root links to A and B; A links to C. Expected order:
        // root, A, B (discovery order), then C — never C before A or B.
        let mut f = frontier("https://x.example.com/", 0);

        let root = f.next().expect("root");
        f.mark_visited(&root.url);
        f.offer("https://x.example.com/a", 1);
        f.offer("https://x.example.com/b", 1);

        let a = f.next().expect("a");
        assert_eq!(a.url, "https://x.example.com/a");
        f.mark_visited(&a.url);
        f.offer("https://x.example.com/c", 2);

        let b = f.next().expect("b");
        assert_eq!(b.url, "https://x.example.com/b");
        f.mark_visited(&b.url);

        let c = f.next().expect("c");
        assert_eq!(c.url, "https://x.example.com/c");
        assert_eq!(c.depth, 2);
    }

    #[test]
    fn visited_url_is_never_returned_again() {
        let mut f = frontier("https://x.example.com/", 0);
        let root = f.next().expect("root");
        f.mark_visited(&root.url);

        // Same page discovered from two different parents.
        f.offer("https://x.example.com/shared", 1);
        f.offer("https://x.example.com/shared", 1);

        let first = f.next().expect("shared");
        f.mark_visited(&first.url);
        assert!(f.next().is_none(), "duplicate enqueue must be skipped");
    }

    #[test]
    fn visited_check_precedes_depth_cutoff() {
        let mut f = frontier("https://x.example.com/", 1);
        f.mark_visited("https://x.example.com/page");

        // Rediscovered past the depth limit: already visited, nothing happens
        // (and in particular no re-enqueue at the deeper depth).
        f.offer("https://x.example.com/page", 5);
        assert!(f.next().map(|e| e.url) == Some("https://x.example.com/".to_string()));
        assert!(f.next().is_none());
    }

    #[test]
    fn depth_cutoff_drops_silently() {
        let mut f = frontier("https://x.example.com/", 1);
        let root = f.next().expect("root");
        f.mark_visited(&root.url);

        f.offer("https://x.example.com/depth1", 1);
        f.offer("https://x.example.com/depth2", 2);

        let next = f.next().expect("depth1");
        assert_eq!(next.url, "https://x.example.com/depth1");
        f.mark_visited(&next.url);
        assert!(f.next().is_none(), "entry past max_depth must be dropped");
    }

    #[test]
    fn zero_max_depth_is_unbounded() {
        let mut f = frontier("https://x.example.com/", 0);
        let root = f.next().expect("root");
        f.mark_visited(&root.url);

        f.offer("https://x.example.com/deep", 9999);
        assert!(f.next().is_some());
    }

    #[test]
    fn out_of_scope_and_excluded_links_are_rejected() {
        let root = Url::parse("https://x.example.com/docs/").unwrap();
        let scope = CrawlScope::new(&root, &["https://x.example.com/docs/private".to_string()]);
        let mut f = Frontier::new(&root, scope, 0);

        let seed = f.next().expect("root");
        f.mark_visited(&seed.url);

        f.offer("https://elsewhere.example.com/docs/page", 1);
        f.offer("https://x.example.com/blog/post", 1);
        f.offer("https://x.example.com/docs/private/key", 1);
        assert!(f.next().is_none());
    }

    #[test]
    fn mark_visited_is_idempotent() {
        let mut f = frontier("https://x.example.com/", 0);
        f.mark_visited("https://x.example.com/p");
        f.mark_visited("https://x.example.com/p");
        assert_eq!(f.visited_len(), 1);
    }
}
