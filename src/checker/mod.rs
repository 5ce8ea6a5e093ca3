// src/checker/mod.rs
// =============================================================================
// This module contains the per-link logic the crawler builds on.
//
// Submodules:
// - classify: decides whether an href is internal, external or ignored
// - html:     pulls <a href> values out of a page
// - http:     checks external links (HEAD, GET fallback) in fixed batches
//
// This file (mod.rs) is the module root and re-exports the public API, so
// callers write `checker::classify_href()` instead of
// `checker::classify::classify_href()`.
// =============================================================================

mod classify;
mod html;
mod http;

pub use classify::{classify_href, LinkKind};
pub use html::extract_hrefs;
pub use http::{
    check_external_links, check_single_link, HttpProber, LinkCheckResult, LinkProber, LinkStatus,
    ProbeMethod,
};
