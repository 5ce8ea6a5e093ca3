// src/cache/skip.rs
// =============================================================================
// Decides whether a stage can be skipped.
//
// A stage is skipped only when BOTH hold:
// 1. its last recorded outcome is "passed"
// 2. the files it watches are exactly the ones fingerprinted last time, with
//    the same hashes (no edits, no deletions, no new files)
//
// The fresh fingerprints are returned either way. They are the ones to record
// once the stage has run: hashing again afterwards would miss edits made
// while the stage was running.
// =============================================================================

use crate::config::Config;
use std::path::Path;

use super::fingerprint::{fingerprint_stage, Fingerprints};
use super::record::{CacheRecord, Stage, StageOutcome};

/// How many changed paths the reason string names before summarizing.
const REASON_PATH_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipDecision {
    pub skip: bool,
    pub reason: Option<String>,
    pub fingerprints: Fingerprints,
}

/// Fingerprints the stage's files under `root` and compares them with `record`.
pub fn should_skip(stage: Stage, config: &Config, record: &CacheRecord, root: &Path) -> SkipDecision {
    let fingerprints = fingerprint_stage(stage, config, root);
    decide(stage, record, fingerprints)
}

fn decide(stage: Stage, record: &CacheRecord, fingerprints: Fingerprints) -> SkipDecision {
    match record.outcome(stage) {
        Some(StageOutcome::Passed) => {}
        Some(StageOutcome::Failed) => {
            return SkipDecision {
                skip: false,
                reason: Some("last run failed".to_string()),
                fingerprints,
            };
        }
        None => {
            return SkipDecision {
                skip: false,
                reason: Some("no previous run recorded".to_string()),
                fingerprints,
            };
        }
    }

    let empty = Fingerprints::new();
    let cached = record.fingerprints(stage).unwrap_or(&empty);
    let changed = changed_paths(cached, &fingerprints);

    if changed.is_empty() {
        SkipDecision {
            skip: true,
            reason: Some("no changes since last passing run".to_string()),
            fingerprints,
        }
    } else {
        SkipDecision {
            skip: false,
            reason: Some(describe_changes(&changed)),
            fingerprints,
        }
    }
}

/// Edited and new files (in current order), then deleted files.
fn changed_paths<'a>(cached: &'a Fingerprints, current: &'a Fingerprints) -> Vec<&'a str> {
    let mut changed: Vec<&str> = current
        .iter()
        .filter(|(path, hash)| cached.get(*path) != Some(*hash))
        .map(|(path, _)| path.as_str())
        .collect();

    changed.extend(
        cached
            .keys()
            .filter(|path| !current.contains_key(*path))
            .map(String::as_str),
    );
    changed
}

fn describe_changes(changed: &[&str]) -> String {
    let named = changed
        .iter()
        .take(REASON_PATH_LIMIT)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");

    if changed.len() > REASON_PATH_LIMIT {
        format!(
            "{} files changed ({named}, and {} more)",
            changed.len(),
            changed.len() - REASON_PATH_LIMIT
        )
    } else if changed.len() == 1 {
        format!("1 file changed ({named})")
    } else {
        format!("{} files changed ({named})", changed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(entries: &[(&str, &str)]) -> Fingerprints {
        entries
            .iter()
            .map(|(p, h)| (p.to_string(), h.to_string()))
            .collect()
    }

    fn passed_with(stage: Stage, fingerprints: Fingerprints) -> CacheRecord {
        let mut record = CacheRecord::default();
        record.record_outcome(stage, StageOutcome::Passed, fingerprints);
        record
    }

    #[test]
    fn test_first_run_never_skips() {
        let decision = decide(Stage::Css, &CacheRecord::default(), fp(&[("a.css", "1")]));
        assert!(!decision.skip);
        assert_eq!(decision.fingerprints, fp(&[("a.css", "1")]));
    }

    #[test]
    fn test_failed_stage_never_skips_even_when_unchanged() {
        let mut record = CacheRecord::default();
        record.record_outcome(Stage::Html, StageOutcome::Failed, fp(&[("a.html", "1")]));

        let decision = decide(Stage::Html, &record, fp(&[("a.html", "1")]));
        assert!(!decision.skip);
        assert_eq!(decision.reason.as_deref(), Some("last run failed"));
    }

    #[test]
    fn test_passed_and_unchanged_skips() {
        let record = passed_with(Stage::Css, fp(&[("a.css", "1"), ("b.css", "2")]));
        let decision = decide(Stage::Css, &record, fp(&[("a.css", "1"), ("b.css", "2")]));
        assert!(decision.skip);
    }

    #[test]
    fn test_edited_file_forces_run() {
        let record = passed_with(Stage::Css, fp(&[("a.css", "1")]));
        let decision = decide(Stage::Css, &record, fp(&[("a.css", "2")]));
        assert!(!decision.skip);
        assert_eq!(decision.reason.as_deref(), Some("1 file changed (a.css)"));
    }

    #[test]
    fn test_deleted_file_forces_run() {
        let record = passed_with(Stage::Css, fp(&[("a.css", "1"), ("b.css", "2")]));
        let decision = decide(Stage::Css, &record, fp(&[("a.css", "1")]));
        assert!(!decision.skip);
        assert_eq!(decision.reason.as_deref(), Some("1 file changed (b.css)"));
    }

    #[test]
    fn test_new_file_forces_run() {
        let record = passed_with(Stage::Css, fp(&[("a.css", "1")]));
        let decision = decide(Stage::Css, &record, fp(&[("a.css", "1"), ("c.css", "3")]));
        assert!(!decision.skip);
    }

    #[test]
    fn test_other_stage_result_does_not_leak() {
        let record = passed_with(Stage::Css, fp(&[("a.css", "1")]));
        let decision = decide(Stage::Html, &record, Fingerprints::new());
        assert!(!decision.skip);
    }

    #[test]
    fn test_reason_summarizes_many_changes() {
        let changed = ["a", "b", "c", "d", "e"];
        assert_eq!(
            describe_changes(&changed),
            "5 files changed (a, b, c, and 2 more)"
        );
    }

    #[test]
    fn test_should_skip_against_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("assets/css/main.css");
        std::fs::create_dir_all(css.parent().unwrap()).unwrap();
        std::fs::write(&css, "body { color: red }").unwrap();

        let config = Config::default();
        let mut record = CacheRecord::default();

        let first = should_skip(Stage::Css, &config, &record, dir.path());
        assert!(!first.skip);
        record.record_outcome(Stage::Css, StageOutcome::Passed, first.fingerprints);

        let second = should_skip(Stage::Css, &config, &record, dir.path());
        assert!(second.skip);

        std::fs::write(&css, "body { color: blue }").unwrap();
        let third = should_skip(Stage::Css, &config, &record, dir.path());
        assert!(!third.skip);
    }

    #[test]
    fn test_edit_during_run_is_not_recorded_as_checked() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("assets/css/main.css");
        std::fs::create_dir_all(css.parent().unwrap()).unwrap();
        std::fs::write(&css, "body { color: red }").unwrap();

        let config = Config::default();
        let mut record = CacheRecord::default();

        let decision = should_skip(Stage::Css, &config, &record, dir.path());
        assert!(!decision.skip);
        // The stage is now running; someone saves a half-typed rule
        std::fs::write(&css, "body { color:").unwrap();
        record.record_outcome(Stage::Css, StageOutcome::Passed, decision.fingerprints);

        let next = should_skip(Stage::Css, &config, &record, dir.path());
        assert!(!next.skip);
        assert_eq!(
            next.reason.as_deref(),
            Some("1 file changed (assets/css/main.css)")
        );
    }

    #[test]
    fn test_pending_snapshot_keeps_edit_during_run_visible() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("assets/css/main.css");
        std::fs::create_dir_all(css.parent().unwrap()).unwrap();
        std::fs::write(&css, "body { color: red }").unwrap();

        let config = Config::default();
        let mut record = CacheRecord::default();

        let decision = should_skip(Stage::Css, &config, &record, dir.path());
        record.stage_started(Stage::Css, decision.fingerprints);
        std::fs::write(&css, "body { color:").unwrap();
        record.finish_stage(Stage::Css, StageOutcome::Passed);

        assert!(!should_skip(Stage::Css, &config, &record, dir.path()).skip);
    }

    #[test]
    fn test_finish_without_snapshot_forces_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("assets/css/main.css");
        std::fs::create_dir_all(css.parent().unwrap()).unwrap();
        std::fs::write(&css, "body {}").unwrap();

        let config = Config::default();
        let mut record = CacheRecord::default();
        record.finish_stage(Stage::Css, StageOutcome::Passed);

        assert!(!should_skip(Stage::Css, &config, &record, dir.path()).skip);
    }
}
