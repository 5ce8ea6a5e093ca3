// src/error.rs
// =============================================================================
// Typed errors for the library layers.
//
// Neither error ever fails a pipeline run on its own:
// - CacheError is swallowed by CacheStore (load -> empty record, save -> warn)
// - FetchError becomes a broken-link entry in the crawl report
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read cache file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache file {path} has schema version {found}, expected {expected}")]
    Version {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("failed to serialize cache record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a page fetch or a link check produced no HTTP status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out")]
    Timeout,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Could not resolve hostname")]
    Dns,
    #[error("Connection failed")]
    Connect,
    #[error("SSL certificate error")]
    Tls,
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Sorts a reqwest error into the buckets the reports show.
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        // The Display text is the only place reqwest exposes DNS/TLS details
        let error_string = error.to_string().to_lowercase();

        if error.is_timeout() {
            FetchError::Timeout
        } else if error.is_redirect() {
            FetchError::TooManyRedirects
        } else if error.is_connect() {
            if error_string.contains("dns") {
                FetchError::Dns
            } else {
                FetchError::Connect
            }
        } else if error_string.contains("certificate") || error_string.contains("ssl") {
            FetchError::Tls
        } else {
            FetchError::Other(error.to_string())
        }
    }
}
