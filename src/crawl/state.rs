// src/crawl/state.rs
// =============================================================================
// Bookkeeping for one crawl run.
//
// Invariants:
// - a path enters the frontier at most once (checked against visited and the
//   current frontier before enqueueing)
// - visited only grows, and a path is marked visited right before its fetch,
//   so |visited| equals the number of fetches
// - broken and skipped lists keep discovery order
// =============================================================================

use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Origin reported for the start page, which no page links to.
pub const START_ORIGIN: &str = "start";

/// HTTP status of a broken link, or "error" when there was no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokenStatus {
    Code(u16),
    Error,
}

impl Serialize for BrokenStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BrokenStatus::Code(code) => serializer.serialize_u16(*code),
            BrokenStatus::Error => serializer.serialize_str("error"),
        }
    }
}

impl fmt::Display for BrokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokenStatus::Code(code) => write!(f, "{code}"),
            BrokenStatus::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub url: String,
    pub status: BrokenStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub found_on: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLink {
    pub url: String,
    pub reason: String,
    pub found_on: String,
}

#[derive(Debug, Default)]
pub struct CrawlState {
    visited: HashSet<String>,
    /// Fetch order, for reporting
    visit_order: Vec<String>,
    frontier: VecDeque<String>,
    /// Mirror of `frontier` for O(1) membership checks
    queued: HashSet<String>,
    origin_map: HashMap<String, String>,
    external_seen: HashSet<String>,
    pub broken_internal: Vec<BrokenLink>,
    pub broken_external: Vec<BrokenLink>,
    pub skipped_external: Vec<SkippedLink>,
}

impl CrawlState {
    /// A fresh state with `start_path` queued.
    pub fn new(start_path: &str) -> Self {
        let mut state = Self::default();
        state.frontier.push_back(start_path.to_string());
        state.queued.insert(start_path.to_string());
        state
    }

    /// Pops the next unvisited path and marks it visited.
    pub fn next_path(&mut self) -> Option<String> {
        while let Some(path) = self.frontier.pop_front() {
            self.queued.remove(&path);
            // Already fetched: discard and keep going
            if self.visited.insert(path.clone()) {
                self.visit_order.push(path.clone());
                return Some(path);
            }
        }
        None
    }

    /// Queues `path` unless it was already visited or queued.
    /// Returns true when it was queued now.
    pub fn enqueue(&mut self, path: &str, found_on: &str) -> bool {
        if self.visited.contains(path) || self.queued.contains(path) {
            return false;
        }
        self.frontier.push_back(path.to_string());
        self.queued.insert(path.to_string());
        self.origin_map
            .entry(path.to_string())
            .or_insert_with(|| found_on.to_string());
        true
    }

    /// Notes an external URL. Returns true the first time it is seen; the
    /// first page it was found on is kept as its origin.
    pub fn note_external(&mut self, url: &str, found_on: &str) -> bool {
        if !self.external_seen.insert(url.to_string()) {
            return false;
        }
        self.origin_map
            .entry(url.to_string())
            .or_insert_with(|| found_on.to_string());
        true
    }

    /// Where `path_or_url` was first discovered ("start" for the start page).
    pub fn found_on(&self, path_or_url: &str) -> String {
        self.origin_map
            .get(path_or_url)
            .cloned()
            .unwrap_or_else(|| START_ORIGIN.to_string())
    }

    pub fn record_broken_internal(&mut self, path: &str, status: BrokenStatus, error: Option<String>) {
        let found_on = self.found_on(path);
        self.broken_internal.push(BrokenLink {
            url: path.to_string(),
            status,
            error,
            found_on,
        });
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn visit_order(&self) -> &[String] {
        &self.visit_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_path_queued_once() {
        let mut state = CrawlState::new("/");
        assert!(!state.enqueue("/", "/"));

        assert_eq!(state.next_path().as_deref(), Some("/"));
        assert!(state.enqueue("/a/", "/"));
        assert!(!state.enqueue("/a/", "/b/"));
        assert!(!state.enqueue("/", "/a/"));

        assert_eq!(state.next_path().as_deref(), Some("/a/"));
        assert_eq!(state.next_path(), None);
        assert_eq!(state.visited_count(), 2);
        assert_eq!(state.found_on("/a/"), "/");
    }

    #[test]
    fn test_start_page_origin() {
        let state = CrawlState::new("/");
        assert_eq!(state.found_on("/"), START_ORIGIN);
    }

    #[test]
    fn test_external_first_origin_wins() {
        let mut state = CrawlState::new("/");
        assert!(state.note_external("https://x.example", "/a/"));
        assert!(!state.note_external("https://x.example", "/b/"));
        assert_eq!(state.found_on("https://x.example"), "/a/");
    }

    #[test]
    fn test_broken_status_serializes_as_number_or_error() {
        let link = BrokenLink {
            url: "/broken/".to_string(),
            status: BrokenStatus::Code(404),
            error: None,
            found_on: "/".to_string(),
        };
        let value = serde_json::to_value(&link).unwrap();
        assert_eq!(value, serde_json::json!({"url": "/broken/", "status": 404, "foundOn": "/"}));

        let value = serde_json::to_value(BrokenStatus::Error).unwrap();
        assert_eq!(value, "error");
    }
}
