// src/report.rs
// =============================================================================
// JSON link reports.
//
// Each `links` run can leave a report in reports_dir named
// "<stem of report_filename>-<YYYYmmdd-HHMMSS-micros>.json" (UTC). After
// writing, older reports with the same stem are deleted so that at most
// report_retention remain. Only names of exactly that shape are pruned, so a
// stem of "validation" leaves "validation-report-*.json" alone. Rendering
// these into Markdown is left to downstream tooling.
// =============================================================================

use crate::config::Config;
use crate::crawl::{ExternalCrawlReport, InternalCrawlReport};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// chrono format of the timestamp part of report names.
const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%6f";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkReport {
    pub generated_at: String,
    pub base_url: String,
    pub internal: InternalCrawlReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalCrawlReport>,
}

impl LinkReport {
    pub fn new(
        base_url: &str,
        internal: InternalCrawlReport,
        external: Option<ExternalCrawlReport>,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            base_url: base_url.to_string(),
            internal,
            external,
        }
    }
}

/// Writes `report` under `root/reports_dir` and prunes old ones.
/// Returns the path written.
pub fn write_link_report(config: &Config, root: &Path, report: &LinkReport) -> Result<PathBuf> {
    let dir = root.join(&config.reports_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create reports directory {}", dir.display()))?;

    let stem = report_stem(&config.report_filename);
    let json = serde_json::to_string_pretty(report)?;
    let path = create_report_file(&dir, &stem, json.as_bytes())?;

    // The report just written always survives
    let removed = prune_reports(&dir, &stem, config.report_retention.max(1))?;
    if !removed.is_empty() {
        tracing::debug!(count = removed.len(), "pruned old reports");
    }
    Ok(path)
}

// Never overwrites: a name taken within the same microsecond is retried
// with a fresh timestamp.
fn create_report_file(dir: &Path, stem: &str, contents: &[u8]) -> Result<PathBuf> {
    loop {
        let name = format!("{stem}-{}.json", Utc::now().format(REPORT_TIMESTAMP_FORMAT));
        let path = dir.join(name);
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("failed to create report {}", path.display()))
            }
        };
        file.write_all(contents)
            .with_context(|| format!("failed to write report {}", path.display()))?;
        return Ok(path);
    }
}

/// Deletes all but the newest `keep` "<stem>-<timestamp>.json" files in
/// `dir`. Returns what was deleted.
pub fn prune_reports(dir: &Path, stem: &str, keep: usize) -> Result<Vec<PathBuf>> {
    let mut reports: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| is_report_name(n, stem))
        })
        .collect();

    // Timestamped names sort oldest first
    reports.sort();

    let excess = reports.len().saturating_sub(keep);
    let mut removed = Vec::with_capacity(excess);
    for path in reports.into_iter().take(excess) {
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove old report {}", path.display()))?;
        removed.push(path);
    }
    Ok(removed)
}

fn is_report_name(name: &str, stem: &str) -> bool {
    name.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(".json"))
        .is_some_and(is_report_timestamp)
}

/// Matches "YYYYmmdd-HHMMSS-ffffff".
fn is_report_timestamp(s: &str) -> bool {
    s.len() == 22
        && s.bytes().enumerate().all(|(i, b)| match i {
            8 | 15 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

fn report_stem(report_filename: &str) -> String {
    Path::new(report_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("validation-report")
        .to_string()
}
