// src/checker/http.rs
// =============================================================================
// This module checks if external URLs are reachable.
//
// Key functionality:
// - Makes HTTP HEAD requests (lightweight, no body download)
// - Retries with GET when the server answers 405 Method Not Allowed
// - Ignores TLS certificate problems (we check reachability, not security)
// - Runs checks in fixed-size batches; a batch finishes completely before
//   the next one starts
//
// "Broken" means the request errored or came back with a status >= 400.
// 2xx and 3xx are fine.
// =============================================================================

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Head,
    Get,
}

/// Plain HTTP existence check. Returns the status code or why there is none.
#[async_trait]
pub trait LinkProber: Send + Sync {
    async fn probe(&self, method: ProbeMethod, url: &str) -> Result<u16, FetchError>;
}

/// reqwest-backed prober used outside tests.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(true)
            .user_agent(concat!("site-guardian/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkProber for HttpProber {
    async fn probe(&self, method: ProbeMethod, url: &str) -> Result<u16, FetchError> {
        let method = match method {
            ProbeMethod::Head => Method::HEAD,
            ProbeMethod::Get => Method::GET,
        };

        self.client
            .request(method, url)
            .send()
            .await
            .map(|response| response.status().as_u16())
            .map_err(|e| FetchError::from_reqwest(&e))
    }
}

// Represents the status of a link after checking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// 2xx
    Ok(u16),
    /// 3xx, left as-is (only reachable when the redirect is not followed)
    Redirect(u16),
    /// >= 400
    Broken(u16),
    /// No response at all
    Error(FetchError),
}

impl LinkStatus {
    fn from_code(code: u16) -> Self {
        match StatusCode::from_u16(code) {
            Ok(s) if s.is_success() => LinkStatus::Ok(code),
            Ok(s) if s.is_redirection() => LinkStatus::Redirect(code),
            _ if code >= 400 => LinkStatus::Broken(code),
            // 1xx or nonsense codes: reachable, nothing to report
            _ => LinkStatus::Ok(code),
        }
    }
}

// Represents the result of checking a single external link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCheckResult {
    /// The URL that was checked
    pub url: String,
    /// Page the link was first found on
    pub found_on: String,
    pub status: LinkStatus,
}

impl LinkCheckResult {
    /// Returns true for Ok and Redirect statuses
    pub fn is_ok(&self) -> bool {
        matches!(self.status, LinkStatus::Ok(_) | LinkStatus::Redirect(_))
    }
}

/// Checks `(url, found_on)` pairs `batch_size` at a time.
///
/// Results come back grouped by batch in input order. Within a batch the
/// checks run concurrently; every failure is caught and becomes a result.
pub async fn check_external_links<P>(
    prober: &P,
    links: Vec<(String, String)>,
    batch_size: usize,
) -> Vec<LinkCheckResult>
where
    P: LinkProber + ?Sized,
{
    let mut results = Vec::with_capacity(links.len());

    for batch in links.chunks(batch_size.max(1)) {
        let checks = batch
            .iter()
            .map(|(url, found_on)| check_single_link(prober, url, found_on));
        results.extend(futures::future::join_all(checks).await);
    }

    results
}

/// HEAD first; a 405 answer earns a second try with GET.
pub async fn check_single_link<P>(prober: &P, url: &str, found_on: &str) -> LinkCheckResult
where
    P: LinkProber + ?Sized,
{
    let mut outcome = prober.probe(ProbeMethod::Head, url).await;

    if matches!(outcome, Ok(405)) {
        tracing::debug!(url, "HEAD not allowed, retrying with GET");
        outcome = prober.probe(ProbeMethod::Get, url).await;
    }

    let status = match outcome {
        Ok(code) => LinkStatus::from_code(code),
        Err(e) => LinkStatus::Error(e),
    };

    LinkCheckResult {
        url: url.to_string(),
        found_on: found_on.to_string(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table and remembers every call.
    #[derive(Default)]
    struct TableProber {
        head: HashMap<String, Result<u16, FetchError>>,
        get: HashMap<String, Result<u16, FetchError>>,
        calls: Mutex<Vec<(ProbeMethod, String)>>,
    }

    #[async_trait]
    impl LinkProber for TableProber {
        async fn probe(&self, method: ProbeMethod, url: &str) -> Result<u16, FetchError> {
            self.calls.lock().unwrap().push((method, url.to_string()));
            let table = match method {
                ProbeMethod::Head => &self.head,
                ProbeMethod::Get => &self.get,
            };
            table
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchError::Connect))
        }
    }

    #[tokio::test]
    async fn test_head_405_falls_back_to_get() {
        let mut prober = TableProber::default();
        prober.head.insert("https://a.example".into(), Ok(405));
        prober.get.insert("https://a.example".into(), Ok(200));

        let result = check_single_link(&prober, "https://a.example", "/").await;
        assert!(result.is_ok());
        assert_eq!(
            *prober.calls.lock().unwrap(),
            vec![
                (ProbeMethod::Head, "https://a.example".to_string()),
                (ProbeMethod::Get, "https://a.example".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_only_after_405() {
        let mut prober = TableProber::default();
        prober.head.insert("https://a.example".into(), Ok(404));

        let result = check_single_link(&prober, "https://a.example", "/").await;
        assert_eq!(result.status, LinkStatus::Broken(404));
        assert_eq!(prober.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_becomes_result() {
        let prober = TableProber::default();
        let result = check_single_link(&prober, "https://down.example", "/x/").await;
        assert_eq!(result.status, LinkStatus::Error(FetchError::Connect));
        assert_eq!(result.found_on, "/x/");
        assert!(!result.is_ok());
    }

    #[tokio::test]
    async fn test_batches_cover_every_link() {
        let mut prober = TableProber::default();
        let mut links = Vec::new();
        for i in 0..12 {
            let url = format!("https://site{i}.example");
            prober.head.insert(url.clone(), Ok(if i % 4 == 0 { 500 } else { 200 }));
            links.push((url, "/".to_string()));
        }

        let results = check_external_links(&prober, links, 5).await;
        assert_eq!(results.len(), 12);
        assert_eq!(results.iter().filter(|r| !r.is_ok()).count(), 3);

        // Batch grouping is fixed even though order inside a batch is not promised
        let mut first_batch: Vec<_> = results[..5].iter().map(|r| r.url.clone()).collect();
        first_batch.sort();
        let mut expected: Vec<_> = (0..5).map(|i| format!("https://site{i}.example")).collect();
        expected.sort();
        assert_eq!(first_batch, expected);
    }

    #[test]
    fn test_status_buckets() {
        assert_eq!(LinkStatus::from_code(204), LinkStatus::Ok(204));
        assert_eq!(LinkStatus::from_code(301), LinkStatus::Redirect(301));
        assert_eq!(LinkStatus::from_code(400), LinkStatus::Broken(400));
        assert_eq!(LinkStatus::from_code(503), LinkStatus::Broken(503));
    }
}
