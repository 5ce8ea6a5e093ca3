// src/cache/record.rs
// =============================================================================
// The persisted cache record and its on-disk store.
//
// File format (JSON):
//   {
//     "version": 1,
//     "tests":     { "css": "passed", "html": "failed" },
//     "fileHashes": { "css": { "assets/css/main.css": "<hash>" } },
//     "lastRun":   "2026-01-01T12:00:00+00:00" | null,
//     "pendingHashes": { "css": { ... } }      (only while a stage is running)
//   }
//
// pendingHashes holds the fingerprints taken when a stage was about to run.
// Recording the outcome stores those, never a re-hash taken afterwards, so a
// file edited while the stage ran still counts as changed next time.
//
// Lifecycle: loaded once when the pipeline starts, mutated in memory, saved
// once at the end. Two concurrent runs are not coordinated (last writer wins).
// =============================================================================

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::fingerprint::Fingerprints;

/// Bumped whenever the file layout changes. Older files become cache misses.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// One pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Hugo,
    Css,
    Html,
    Tests,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Hugo, Stage::Css, Stage::Html, Stage::Tests];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Hugo => "hugo",
            Stage::Css => "css",
            Stage::Html => "html",
            Stage::Tests => "tests",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}' (expected hugo, css, html or tests)"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageOutcome {
    Passed,
    Failed,
}

impl FromStr for StageOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(StageOutcome::Passed),
            "failed" => Ok(StageOutcome::Failed),
            other => Err(format!("unknown outcome '{other}' (expected passed or failed)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version: u32,
    /// Last outcome per stage
    #[serde(rename = "tests", default)]
    pub stage_outcomes: BTreeMap<Stage, StageOutcome>,
    /// Fingerprints recorded the last time each stage actually ran
    #[serde(rename = "fileHashes", default)]
    pub stage_file_fingerprints: BTreeMap<Stage, Fingerprints>,
    #[serde(rename = "lastRun", default)]
    pub last_run_timestamp: Option<String>,
    /// Pre-run fingerprints of stages that have started but not been recorded
    #[serde(
        rename = "pendingHashes",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub pending_fingerprints: BTreeMap<Stage, Fingerprints>,
}

impl Default for CacheRecord {
    fn default() -> Self {
        Self {
            version: CACHE_SCHEMA_VERSION,
            stage_outcomes: BTreeMap::new(),
            stage_file_fingerprints: BTreeMap::new(),
            last_run_timestamp: None,
            pending_fingerprints: BTreeMap::new(),
        }
    }
}

impl CacheRecord {
    pub fn outcome(&self, stage: Stage) -> Option<StageOutcome> {
        self.stage_outcomes.get(&stage).copied()
    }

    pub fn fingerprints(&self, stage: Stage) -> Option<&Fingerprints> {
        self.stage_file_fingerprints.get(&stage)
    }

    /// Stores the result of a stage that ran in this pipeline invocation.
    ///
    /// This is the only way fingerprints get replaced, so call it for stages
    /// that executed and never for stages that were skipped.
    pub fn record_outcome(&mut self, stage: Stage, outcome: StageOutcome, fingerprints: Fingerprints) {
        self.stage_outcomes.insert(stage, outcome);
        self.stage_file_fingerprints.insert(stage, fingerprints);
        self.pending_fingerprints.remove(&stage);
        self.last_run_timestamp = Some(chrono::Utc::now().to_rfc3339());
    }

    /// Remembers what the stage's files looked like just before it runs.
    pub fn stage_started(&mut self, stage: Stage, fingerprints: Fingerprints) {
        self.pending_fingerprints.insert(stage, fingerprints);
    }

    /// Records the outcome of a stage started with [`stage_started`].
    ///
    /// Without a pending snapshot nothing is known about the inputs the stage
    /// saw, so an empty set is stored and the next check runs the stage again.
    /// Returns the number of files recorded, or `None` if there was no snapshot.
    ///
    /// [`stage_started`]: CacheRecord::stage_started
    pub fn finish_stage(&mut self, stage: Stage, outcome: StageOutcome) -> Option<usize> {
        let pending = self.pending_fingerprints.remove(&stage);
        let files = pending.as_ref().map(|f| f.len());
        self.record_outcome(stage, outcome, pending.unwrap_or_default());
        files
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Reads and writes the cache file. Both directions are best-effort.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing, unreadable, corrupt or outdated file all read
    /// as an empty record, which makes every stage run.
    pub fn load(&self) -> CacheRecord {
        match self.try_load() {
            Ok(Some(record)) => record,
            Ok(None) => CacheRecord::default(),
            Err(e) => {
                tracing::warn!("ignoring cache: {e}");
                CacheRecord::default()
            }
        }
    }

    /// Never fails either; problems are logged and the pipeline carries on.
    pub fn save(&self, record: &CacheRecord) {
        if let Err(e) = self.try_save(record) {
            tracing::warn!("could not save cache: {e}");
        }
    }

    fn try_load(&self) -> Result<Option<CacheRecord>, CacheError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        // Peek at the version first so an old layout reports as a version
        // mismatch rather than as a confusing field error.
        let raw: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| CacheError::Parse {
                path: self.path.clone(),
                source,
            })?;
        let found = raw
            .get("version")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        if found != CACHE_SCHEMA_VERSION {
            return Err(CacheError::Version {
                path: self.path.clone(),
                found,
                expected: CACHE_SCHEMA_VERSION,
            });
        }

        let record = serde_json::from_value(raw).map_err(|source| CacheError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(record))
    }

    fn try_save(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let write_err = |source: std::io::Error| CacheError::Write {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(record)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        // Write next to the target and rename so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}
