// src/cache/mod.rs
// =============================================================================
// Incremental change cache.
//
// The pipeline runs expensive stages (site build, CSS lint, HTML validation,
// browser tests) on every pre-commit. This module remembers, per stage, the
// content hashes of the files that stage depends on and whether it last
// passed, so a stage can be skipped when nothing it watches has changed.
//
// Submodules:
// - record:      the persisted CacheRecord and the CacheStore that reads/writes it
// - fingerprint: stage -> watched files -> content hashes
// - skip:        the skip/run decision
//
// Every failure in here degrades to "run the stage", never to "skip it".
// =============================================================================

mod fingerprint;
mod record;
mod skip;

pub use fingerprint::{
    discover_stage_files, fingerprint_file, fingerprint_stage, Fingerprints, MAX_FILES_PER_STAGE,
    MAX_MATCHES_PER_PATTERN,
};
pub use record::{CacheRecord, CacheStore, Stage, StageOutcome, CACHE_SCHEMA_VERSION};
pub use skip::{should_skip, SkipDecision};
