// src/crawl/mod.rs
// =============================================================================
// This module handles site crawling and link verification.
//
// Features:
// - Breadth-first crawl of same-origin pages starting at "/"
// - Internal pass: every internal path fetched once, non-200 pages reported
// - External pass: absolute links collected, skip-listed domains set aside,
//   the rest checked in fixed-size concurrent batches
// - Every failure is caught per page / per link; a bad link never stops
//   the crawl
//
// Broken internal links are a hard failure for the caller. Broken external
// links are reported too, but how much they matter is the caller's call.
// =============================================================================

mod fetch;
mod queue;
mod state;

pub use fetch::{HttpPageFetcher, PageFetcher, RenderedPage};
pub use queue::{crawl_external_links, crawl_internal_links};
pub use state::{BrokenLink, BrokenStatus, CrawlState, SkippedLink, START_ORIGIN};

use crate::config::Config;
use serde::Serialize;
use std::collections::BTreeMap;

/// The parts of the config the crawler uses.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    /// Hostname substring -> reason
    pub skip_external_domains: BTreeMap<String, String>,
    /// Internal path prefixes never enqueued
    pub skip_paths: Vec<String>,
    pub batch_size: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for CrawlOptions {
    fn from(config: &Config) -> Self {
        Self {
            skip_external_domains: config.skip_external_domains.clone(),
            skip_paths: config.skip_paths.clone(),
            batch_size: config.link_check.batch_size.max(1),
        }
    }
}

impl CrawlOptions {
    /// Reason for the first configured domain contained in `host`.
    pub fn skip_reason(&self, host: &str) -> Option<&str> {
        self.skip_external_domains
            .iter()
            .find(|(domain, _)| host.contains(domain.as_str()))
            .map(|(_, reason)| reason.as_str())
    }

    pub fn is_skipped_path(&self, path: &str) -> bool {
        self.skip_paths
            .iter()
            .any(|prefix| !prefix.is_empty() && path.starts_with(prefix.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalCrawlReport {
    pub broken_links: Vec<BrokenLink>,
    pub visited_count: usize,
    /// Paths in the order they were fetched
    pub visited: Vec<String>,
}

impl InternalCrawlReport {
    pub fn passed(&self) -> bool {
        self.broken_links.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCrawlReport {
    pub broken_links: Vec<BrokenLink>,
    pub skipped_links: Vec<SkippedLink>,
    pub checked_count: usize,
}
