// src/crawl/fetch.rs
// =============================================================================
// Page fetching for the crawler.
//
// The crawler only needs two things from a page: its HTTP status and the
// href of every anchor. PageFetcher is that capability; HttpPageFetcher
// implements it with a plain GET plus scraper. It does not execute
// JavaScript, so links inserted by scripts are not seen.
// =============================================================================

use crate::checker::extract_hrefs;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    pub status: u16,
    /// Raw href values, empty unless the status is 200
    pub hrefs: Vec<String>,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RenderedPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("site-guardian/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(RenderedPage {
                status,
                hrefs: Vec::new(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e))?;

        Ok(RenderedPage {
            status,
            hrefs: extract_hrefs(&html),
        })
    }
}
