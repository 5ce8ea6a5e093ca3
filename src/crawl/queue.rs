// src/crawl/queue.rs
// =============================================================================
// This module implements site crawling with a breadth-first approach.
//
// How it works:
// 1. Start with "/" in the frontier
// 2. Pop the next path (FIFO), skip it if already visited, mark it visited
// 3. Fetch base_url + path; a non-200 status or a failed fetch is recorded
//    as a broken internal link and the page's links are not followed
// 4. Classify every href; unseen internal paths go to the back of the queue
// 5. Repeat until the frontier is empty
//
// The external pass runs the same crawl again and additionally collects
// absolute links, which are then checked in batches once the crawl is done.
// Pages are fetched strictly one at a time.
// =============================================================================

use crate::checker::{check_external_links, classify_href, LinkKind, LinkProber, LinkStatus};
use url::Url;

use super::fetch::PageFetcher;
use super::state::{BrokenLink, BrokenStatus, CrawlState, SkippedLink};
use super::{CrawlOptions, ExternalCrawlReport, InternalCrawlReport};

const START_PATH: &str = "/";

/// Crawls every same-origin page reachable from `base_url` + "/" and reports
/// the internal links that did not answer 200.
pub async fn crawl_internal_links<F>(
    base_url: &str,
    fetcher: &F,
    options: &CrawlOptions,
) -> InternalCrawlReport
where
    F: PageFetcher + ?Sized,
{
    let (state, _) = crawl(base_url, fetcher, options, false).await;

    InternalCrawlReport {
        visited_count: state.visited_count(),
        visited: state.visit_order().to_vec(),
        broken_links: state.broken_internal,
    }
}

/// Crawls the site again, collecting external links, and checks each unique
/// one that is not on the skip list.
pub async fn crawl_external_links<F, P>(
    base_url: &str,
    fetcher: &F,
    prober: &P,
    options: &CrawlOptions,
) -> ExternalCrawlReport
where
    F: PageFetcher + ?Sized,
    P: LinkProber + ?Sized,
{
    let (mut state, to_check) = crawl(base_url, fetcher, options, true).await;

    tracing::info!(
        count = to_check.len(),
        batch_size = options.batch_size,
        "checking external links"
    );
    let checked_count = to_check.len();
    let results = check_external_links(prober, to_check, options.batch_size).await;

    state.broken_external = results
        .into_iter()
        .filter_map(|r| {
            let (status, error) = match r.status {
                LinkStatus::Broken(code) => (BrokenStatus::Code(code), None),
                LinkStatus::Error(e) => (BrokenStatus::Error, Some(e.to_string())),
                LinkStatus::Ok(_) | LinkStatus::Redirect(_) => return None,
            };
            Some(BrokenLink {
                url: r.url,
                status,
                error,
                found_on: r.found_on,
            })
        })
        .collect();

    ExternalCrawlReport {
        broken_links: state.broken_external,
        skipped_links: state.skipped_external,
        checked_count,
    }
}

/// The shared BFS. Returns the final state and, when `collect_external` is
/// set, the `(url, found_on)` pairs that still need checking.
async fn crawl<F>(
    base_url: &str,
    fetcher: &F,
    options: &CrawlOptions,
    collect_external: bool,
) -> (CrawlState, Vec<(String, String)>)
where
    F: PageFetcher + ?Sized,
{
    let base = base_url.trim_end_matches('/');
    let mut state = CrawlState::new(START_PATH);
    let mut to_check = Vec::new();

    while let Some(path) = state.next_path() {
        let url = format!("{base}{path}");
        tracing::debug!(%url, "fetching");

        let page = match fetcher.fetch(&url).await {
            Ok(page) if page.status == 200 => page,
            Ok(page) => {
                tracing::debug!(%path, status = page.status, "broken internal link");
                state.record_broken_internal(&path, BrokenStatus::Code(page.status), None);
                continue;
            }
            Err(e) => {
                tracing::debug!(%path, "fetch failed: {e}");
                state.record_broken_internal(&path, BrokenStatus::Error, Some(e.to_string()));
                continue;
            }
        };

        for href in &page.hrefs {
            match classify_href(href) {
                LinkKind::Internal(target) => {
                    if options.is_skipped_path(&target) {
                        continue;
                    }
                    state.enqueue(&target, &path);
                }
                LinkKind::External(target) if collect_external => {
                    note_external(&mut state, &mut to_check, options, target, &path);
                }
                LinkKind::External(_) | LinkKind::Ignored => {}
            }
        }
    }

    tracing::info!(visited = state.visited_count(), "crawl finished");
    (state, to_check)
}

fn note_external(
    state: &mut CrawlState,
    to_check: &mut Vec<(String, String)>,
    options: &CrawlOptions,
    target: String,
    found_on: &str,
) {
    let host = match Url::parse(&target) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_string(),
            None => return,
        },
        Err(e) => {
            // Hand-written content is full of these; nothing to act on
            tracing::debug!(url = %target, "dropping malformed link: {e}");
            return;
        }
    };

    if !state.note_external(&target, found_on) {
        return;
    }

    match options.skip_reason(&host) {
        Some(reason) => state.skipped_external.push(SkippedLink {
            url: target,
            reason: reason.to_string(),
            found_on: found_on.to_string(),
        }),
        None => to_check.push((target, found_on.to_string())),
    }
}
