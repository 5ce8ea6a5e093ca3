// src/cli.rs
// =============================================================================
// This file defines the driver's command-line interface using `clap`.
//
// The driver is thin on purpose: it loads the config, asks the cache which
// stages need to run, runs the link crawler, and records results. The stage
// commands themselves (site build, linters, validators) come from whatever
// calls us, either wrapped with `run` or bracketed by `cache status` and
// `cache record`.
// =============================================================================

use clap::{Parser, Subcommand};
use site_guardian::cache::{Stage, StageOutcome};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "site-guardian",
    version,
    about = "Incremental validation cache and link checker for static sites",
    long_about = "site-guardian decides which validation stages of a static site pipeline \
                  need to run again, and crawls a locally served site for broken internal \
                  and external links."
)]
pub struct Cli {
    /// Config file (JSON). Missing file means built-in defaults.
    #[arg(long, global = true, default_value = site_guardian::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Project root that stage patterns and the cache file are relative to
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the served site for broken links
    ///
    /// Example: site-guardian links http://localhost:1313 --external
    Links {
        /// Base URL of the running site (defaults to siteUrl from the config)
        base_url: Option<String>,

        /// Also check external links (reported as warnings)
        #[arg(long)]
        external: bool,

        /// Treat broken external links as failures
        #[arg(long, requires = "external")]
        strict_external: bool,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,

        /// Do not write a report file into reportsDir
        #[arg(long)]
        no_report: bool,
    },

    /// Inspect or update the stage cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Run a stage command unless the cache says it can be skipped
    ///
    /// The outcome is recorded against the files as they were before the
    /// command started. Exit code is 0 when skipped or passed, 1 when failed.
    ///
    /// Example: site-guardian run css -- npx stylelint "assets/css/**/*.css"
    Run {
        stage: Stage,

        /// Command and arguments to run from the project root
        #[arg(last = true, required = true)]
        command: Vec<String>,

        /// Run even when the cache says the stage can be skipped
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show, per stage, whether it would be skipped and why
    ///
    /// Also snapshots the listed stages' files; a later `cache record` stores
    /// that snapshot. Exit code 0 when every listed stage can be skipped, 1
    /// otherwise.
    Status {
        /// Only these stages (default: all)
        stages: Vec<Stage>,
    },

    /// Record the outcome of a stage that just ran
    ///
    /// Stores the snapshot taken by the last `cache status`. Without one the
    /// stage is recorded with no files and will run again next time.
    ///
    /// Example: site-guardian cache record css passed
    Record { stage: Stage, outcome: StageOutcome },

    /// Forget everything
    Clear,
}
