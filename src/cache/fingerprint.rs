// src/cache/fingerprint.rs
// =============================================================================
// Which files each stage watches, and their content fingerprints.
//
// Discovery is a native directory walk (walkdir) filtered by glob patterns
// (globset). Paths are relative to the project root with '/' separators and
// come back sorted, so the same tree always yields the same file list.
//
// Limits:
// - at most MAX_MATCHES_PER_PATTERN paths are taken from any one pattern
// - at most MAX_FILES_PER_STAGE files are fingerprinted per stage
// Files beyond the caps are simply not observed. Every file that *is*
// observed is compared exactly.
// =============================================================================

use crate::config::Config;
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::record::Stage;

/// Relative path -> content hash.
pub type Fingerprints = BTreeMap<String, String>;

pub const MAX_MATCHES_PER_PATTERN: usize = 500;
pub const MAX_FILES_PER_STAGE: usize = 100;

/// Directories never worth descending into.
const IGNORED_DIRS: &[&str] = &[".git", "node_modules", "target", "resources"];

const HUGO_CONFIG_FILES: &[&str] = &[
    "hugo.toml",
    "hugo.yaml",
    "hugo.json",
    "config.toml",
    "config.yaml",
    "config.json",
];

impl Stage {
    /// Glob patterns (relative to the project root) this stage depends on.
    pub fn watch_patterns(&self, config: &Config) -> Vec<String> {
        match self {
            Stage::Hugo => {
                let mut patterns: Vec<String> =
                    HUGO_CONFIG_FILES.iter().map(|s| s.to_string()).collect();
                for dir in ["content", "layouts", "data", "static"] {
                    patterns.push(format!("{dir}/**"));
                }
                patterns
            }
            Stage::Css => vec![config.css_pattern.clone()],
            Stage::Html => vec!["public/**/*.html".to_string(), "layouts/**".to_string()],
            Stage::Tests => vec!["tests/**".to_string(), "public/**/*.html".to_string()],
        }
    }

    /// Patterns whose matches are dropped from this stage's file set.
    pub fn exclude_patterns(&self, config: &Config) -> Vec<String> {
        match self {
            Stage::Html => config.html_validation.exclude.clone(),
            _ => Vec::new(),
        }
    }
}

/// Sorted, deduplicated, capped list of files the stage watches.
pub fn discover_stage_files(stage: Stage, config: &Config, root: &Path) -> Vec<String> {
    let exclude = build_globset(&stage.exclude_patterns(config));

    let mut found = BTreeSet::new();
    for pattern in stage.watch_patterns(config) {
        let Some(matcher) = build_matcher(&pattern) else {
            continue;
        };
        found.extend(match_pattern(root, &pattern, &matcher, &exclude));
    }

    found.into_iter().take(MAX_FILES_PER_STAGE).collect()
}

/// Hashes every discovered file. Unreadable files are left out, which the
/// skip check then sees as a change.
pub fn fingerprint_stage(stage: Stage, config: &Config, root: &Path) -> Fingerprints {
    let mut fingerprints = Fingerprints::new();
    for rel in discover_stage_files(stage, config, root) {
        match fingerprint_file(&root.join(&rel)) {
            Ok(hash) => {
                fingerprints.insert(rel, hash);
            }
            Err(e) => tracing::debug!(file = %rel, "skipping unreadable file: {e}"),
        }
    }
    fingerprints
}

/// 128-bit hex digest of the file's raw bytes.
///
/// Only used to notice edits, so the BLAKE3 output is truncated.
pub fn fingerprint_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    let hash = blake3::hash(&bytes);
    Ok(hash.to_hex().as_str()[..32].to_string())
}

fn build_matcher(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(e) => {
            tracing::warn!(pattern, "ignoring invalid watch pattern: {e}");
            None
        }
    }
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => tracing::warn!(pattern = %pattern, "ignoring invalid exclude pattern: {e}"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("exclude patterns unusable: {e}");
        GlobSet::empty()
    })
}

/// Walks only the literal directory prefix of the pattern ("content/**"
/// walks content/), in file-name order. Excluded paths do not count toward
/// the per-pattern cap.
fn match_pattern(
    root: &Path,
    pattern: &str,
    matcher: &GlobMatcher,
    exclude: &GlobSet,
) -> Vec<String> {
    let base = literal_base(pattern);
    let start = root.join(&base);
    if !start.exists() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    let walker = WalkDir::new(&start)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_ignored_dir(e));

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = rel_path_slash(root, entry.path()) else {
            continue;
        };
        if matcher.is_match(&rel) && !exclude.is_match(&rel) {
            matches.push(rel);
            if matches.len() >= MAX_MATCHES_PER_PATTERN {
                break;
            }
        }
    }
    matches
}

/// Leading path components that contain no glob metacharacters.
fn literal_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for part in pattern.split('/') {
        if part.is_empty() || part.contains(&['*', '?', '[', '{'][..]) {
            break;
        }
        base.push(part);
    }
    base
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}

fn rel_path_slash(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for comp in rel.components() {
        match comp {
            Component::Normal(s) => parts.push(s.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
