// src/lib.rs
// =============================================================================
// site-guardian core: the pieces of a static-site validation pipeline that
// decide what has to run and what is broken.
//
// - cache:   per-stage file fingerprints + last outcome, decides skip/run
// - crawl:   breadth-first crawl of a served site (internal + external passes)
// - checker: href classification, HTML link extraction, external HTTP checks
// - config:  the immutable configuration the driver hands to both
// - report:  JSON link reports with retention pruning
//
// The cache and the crawler never call each other; the pipeline driver
// (src/main.rs) composes them.
// =============================================================================

pub mod cache;
pub mod checker;
pub mod config;
pub mod crawl;
pub mod error;
pub mod report;

pub use cache::{should_skip, CacheRecord, CacheStore, SkipDecision, Stage, StageOutcome};
pub use config::Config;
pub use crawl::{crawl_external_links, crawl_internal_links, CrawlOptions};
pub use error::{CacheError, FetchError};
