// src/config.rs
// =============================================================================
// Pipeline configuration.
//
// The config file is optional JSON with camelCase keys. Whatever it holds is
// laid over Config::default():
// - object-valued fields (skipExternalDomains, htmlValidation, linkCheck)
//   merge one level deep, so a user can add a skip domain without losing
//   the built-in ones
// - arrays and scalars replace the default wholesale
//
// The result is a plain immutable struct. Nothing here is global.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file looked up in the project root.
pub const DEFAULT_CONFIG_FILE: &str = "site-guardian.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Where the locally served site lives (the crawler's base URL)
    pub site_url: String,
    /// Hostname substring -> reason. Matching external links are not checked.
    pub skip_external_domains: BTreeMap<String, String>,
    /// Internal path prefixes the crawler never enqueues
    pub skip_paths: Vec<String>,
    /// Glob (relative to the project root) watched by the css stage
    pub css_pattern: String,
    pub html_validation: HtmlValidation,
    /// How many JSON link reports to keep in reports_dir
    pub report_retention: usize,
    pub report_filename: String,
    pub reports_dir: PathBuf,
    /// Consumed by the driver's port cleanup, not by this crate's core
    pub ports_to_kill: Vec<u16>,
    pub cache_file: PathBuf,
    pub link_check: LinkCheck,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlValidation {
    /// Globs excluded from HTML validation (and from the html stage fingerprint)
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheck {
    pub internal_timeout_secs: u64,
    pub external_timeout_secs: u64,
    pub batch_size: usize,
}

impl Default for LinkCheck {
    fn default() -> Self {
        Self {
            internal_timeout_secs: 5,
            external_timeout_secs: 10,
            batch_size: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut skip_external_domains = BTreeMap::new();
        skip_external_domains.insert(
            "linkedin.com".to_string(),
            "blocks automated requests".to_string(),
        );

        Self {
            site_url: "http://localhost:1313".to_string(),
            skip_external_domains,
            skip_paths: Vec::new(),
            css_pattern: "assets/css/**/*.css".to_string(),
            html_validation: HtmlValidation::default(),
            report_retention: 10,
            report_filename: "validation-report.md".to_string(),
            reports_dir: PathBuf::from("reports"),
            ports_to_kill: vec![1313],
            cache_file: PathBuf::from(".site-guardian-cache.json"),
            link_check: LinkCheck::default(),
        }
    }
}

/// What a config file may contain. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfig {
    pub site_url: Option<String>,
    pub skip_external_domains: Option<BTreeMap<String, String>>,
    pub skip_paths: Option<Vec<String>>,
    pub css_pattern: Option<String>,
    pub html_validation: Option<PartialHtmlValidation>,
    pub report_retention: Option<usize>,
    pub report_filename: Option<String>,
    pub reports_dir: Option<PathBuf>,
    pub ports_to_kill: Option<Vec<u16>>,
    pub cache_file: Option<PathBuf>,
    pub link_check: Option<PartialLinkCheck>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialHtmlValidation {
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialLinkCheck {
    pub internal_timeout_secs: Option<u64>,
    pub external_timeout_secs: Option<u64>,
    pub batch_size: Option<usize>,
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error: unlike
    /// the cache, a broken config is something the user has to fix.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let partial: PartialConfig = serde_json::from_str(text)?;
        Ok(Self::default().overlay(partial))
    }

    /// Lays `partial` over `self` (see the module header for the rules).
    pub fn overlay(self, partial: PartialConfig) -> Self {
        let mut skip_external_domains = self.skip_external_domains;
        if let Some(extra) = partial.skip_external_domains {
            skip_external_domains.extend(extra);
        }

        let html_validation = match partial.html_validation {
            Some(html) => HtmlValidation {
                exclude: html.exclude.unwrap_or(self.html_validation.exclude),
            },
            None => self.html_validation,
        };

        let link_check = match partial.link_check {
            Some(lc) => LinkCheck {
                internal_timeout_secs: lc
                    .internal_timeout_secs
                    .unwrap_or(self.link_check.internal_timeout_secs),
                external_timeout_secs: lc
                    .external_timeout_secs
                    .unwrap_or(self.link_check.external_timeout_secs),
                // A zero-width batch would never make progress
                batch_size: lc.batch_size.unwrap_or(self.link_check.batch_size).max(1),
            },
            None => self.link_check,
        };

        Self {
            site_url: partial.site_url.unwrap_or(self.site_url),
            skip_external_domains,
            skip_paths: partial.skip_paths.unwrap_or(self.skip_paths),
            css_pattern: partial.css_pattern.unwrap_or(self.css_pattern),
            html_validation,
            report_retention: partial.report_retention.unwrap_or(self.report_retention),
            report_filename: partial.report_filename.unwrap_or(self.report_filename),
            reports_dir: partial.reports_dir.unwrap_or(self.reports_dir),
            ports_to_kill: partial.ports_to_kill.unwrap_or(self.ports_to_kill),
            cache_file: partial.cache_file.unwrap_or(self.cache_file),
            link_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_skip_domains_merge_with_defaults() {
        let config = Config::from_json(
            r#"{"skipExternalDomains": {"archive.org": "rate-limited"}}"#,
        )
        .unwrap();

        assert_eq!(
            config.skip_external_domains.get("archive.org").map(String::as_str),
            Some("rate-limited")
        );
        assert!(config.skip_external_domains.contains_key("linkedin.com"));
    }

    #[test]
    fn test_user_reason_overrides_default_reason() {
        let config =
            Config::from_json(r#"{"skipExternalDomains": {"linkedin.com": "login wall"}}"#)
                .unwrap();
        assert_eq!(config.skip_external_domains["linkedin.com"], "login wall");
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let config = Config::from_json(r#"{"portsToKill": [8080, 9000]}"#).unwrap();
        assert_eq!(config.ports_to_kill, vec![8080, 9000]);
    }

    #[test]
    fn test_link_check_merges_one_level() {
        let config = Config::from_json(r#"{"linkCheck": {"batchSize": 12}}"#).unwrap();
        assert_eq!(config.link_check.batch_size, 12);
        assert_eq!(config.link_check.internal_timeout_secs, 5);
        assert_eq!(config.link_check.external_timeout_secs, 10);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let config = Config::from_json(r#"{"linkCheck": {"batchSize": 0}}"#).unwrap();
        assert_eq!(config.link_check.batch_size, 1);
    }

    #[test]
    fn test_html_validation_without_exclude_keeps_default() {
        let config = Config::from_json(r#"{"htmlValidation": {}}"#).unwrap();
        assert!(config.html_validation.exclude.is_empty());

        let config =
            Config::from_json(r#"{"htmlValidation": {"exclude": ["public/admin/**"]}}"#).unwrap();
        assert_eq!(config.html_validation.exclude, vec!["public/admin/**"]);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
