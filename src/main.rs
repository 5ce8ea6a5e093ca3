// src/main.rs
// =============================================================================
// This is the entry point of the pipeline driver.
//
// What happens here:
// 1. Set up logging (stderr, RUST_LOG, default "info")
// 2. Parse command-line arguments using clap and load the config
// 3. Dispatch to the subcommand handler
// 4. Exit with proper code (0 = success, 1 = failures found, 2 = error)
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{CacheAction, Cli, Commands};
use site_guardian::cache::{self, CacheStore, Stage, StageOutcome};
use site_guardian::checker::HttpProber;
use site_guardian::crawl::{
    self, BrokenLink, CrawlOptions, ExternalCrawlReport, HttpPageFetcher, InternalCrawlReport,
};
use site_guardian::report::{self, LinkReport};
use site_guardian::Config;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            tracing::error!("{e:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns:
//   Ok(0) = nothing failed
//   Ok(1) = broken links found / stages need to run
//   Err   = unexpected error (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = Config::load(&cli.root.join(&cli.config))?;

    match cli.command {
        Commands::Links {
            base_url,
            external,
            strict_external,
            json,
            no_report,
        } => {
            let base_url = base_url.unwrap_or_else(|| config.site_url.clone());
            let opts = LinksArgs {
                external,
                strict_external,
                json,
                write_report: !no_report,
            };
            handle_links(&config, &cli.root, &base_url, opts).await
        }
        Commands::Cache { action } => handle_cache(&config, &cli.root, action),
        Commands::Run {
            stage,
            command,
            force,
        } => handle_run(&config, &cli.root, stage, &command, force).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(0)
        }
    }
}

struct LinksArgs {
    external: bool,
    strict_external: bool,
    json: bool,
    write_report: bool,
}

async fn handle_links(config: &Config, root: &Path, base_url: &str, args: LinksArgs) -> Result<i32> {
    let options = CrawlOptions::from(config);
    let fetcher = HttpPageFetcher::new(Duration::from_secs(config.link_check.internal_timeout_secs))
        .context("failed to create HTTP client")?;

    tracing::info!(%base_url, "checking internal links");
    let internal = crawl::crawl_internal_links(base_url, &fetcher, &options).await;

    let external = if args.external {
        let prober = HttpProber::new(Duration::from_secs(config.link_check.external_timeout_secs))
            .context("failed to create HTTP client")?;
        tracing::info!(%base_url, "checking external links");
        Some(crawl::crawl_external_links(base_url, &fetcher, &prober, &options).await)
    } else {
        None
    };

    let report = LinkReport::new(base_url, internal, external);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_internal(&report.internal);
        if let Some(external) = &report.external {
            print_external(external);
        }
    }

    if args.write_report {
        // A report that cannot be written should not hide the link results
        match report::write_link_report(config, root, &report) {
            Ok(path) => tracing::info!(path = %path.display(), "report written"),
            Err(e) => tracing::warn!("could not write report: {e:#}"),
        }
    }

    let external_failed = report
        .external
        .as_ref()
        .is_some_and(|e| !e.broken_links.is_empty());

    if !report.internal.passed() || (args.strict_external && external_failed) {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn handle_cache(config: &Config, root: &Path, action: CacheAction) -> Result<i32> {
    let store = CacheStore::new(root.join(&config.cache_file));
    let mut record = store.load();

    match action {
        CacheAction::Status { stages } => {
            let stages = if stages.is_empty() {
                Stage::ALL.to_vec()
            } else {
                stages
            };

            let mut all_skippable = true;
            println!("{:<8} {:<6} {}", "STAGE", "SKIP", "REASON");
            for stage in stages {
                let decision = cache::should_skip(stage, config, &record, root);
                all_skippable &= decision.skip;
                println!(
                    "{:<8} {:<6} {}",
                    stage,
                    if decision.skip { "yes" } else { "no" },
                    decision.reason.as_deref().unwrap_or("")
                );
                // `cache record` stores this snapshot, not a later re-hash
                record.stage_started(stage, decision.fingerprints);
            }
            store.save(&record);
            Ok(if all_skippable { 0 } else { 1 })
        }
        CacheAction::Record { stage, outcome } => {
            let files = record.finish_stage(stage, outcome);
            store.save(&record);

            match files {
                Some(files) => println!(
                    "Recorded {stage} as {} ({files} file(s) fingerprinted)",
                    outcome_label(outcome)
                ),
                None => {
                    tracing::warn!(
                        %stage,
                        "no snapshot from `cache status`; the stage will run again next time"
                    );
                    println!("Recorded {stage} as {}", outcome_label(outcome));
                }
            }
            Ok(0)
        }
        CacheAction::Clear => {
            record.clear();
            store.save(&record);
            println!("Cache cleared: {}", store.path().display());
            Ok(0)
        }
    }
}

async fn handle_run(
    config: &Config,
    root: &Path,
    stage: Stage,
    command: &[String],
    force: bool,
) -> Result<i32> {
    let store = CacheStore::new(root.join(&config.cache_file));
    let mut record = store.load();

    let decision = cache::should_skip(stage, config, &record, root);
    let reason = decision.reason.as_deref().unwrap_or("");
    if decision.skip && !force {
        println!("⏭️  Skipping {stage}: {reason}");
        return Ok(0);
    }

    let (program, args) = command
        .split_first()
        .context("no command given for the stage")?;
    tracing::info!(%stage, %program, reason, "running stage");

    let status = tokio::process::Command::new(program)
        .args(args)
        .current_dir(root)
        .status()
        .await
        .with_context(|| format!("failed to start `{program}` for stage {stage}"))?;

    let outcome = if status.success() {
        StageOutcome::Passed
    } else {
        StageOutcome::Failed
    };
    // Fingerprints from before the command started
    record.record_outcome(stage, outcome, decision.fingerprints);
    store.save(&record);

    match outcome {
        StageOutcome::Passed => println!("✅ {stage} passed"),
        StageOutcome::Failed => println!("❌ {stage} failed ({status})"),
    }
    Ok(if status.success() { 0 } else { 1 })
}

fn outcome_label(outcome: StageOutcome) -> &'static str {
    match outcome {
        StageOutcome::Passed => "passed",
        StageOutcome::Failed => "failed",
    }
}

fn print_internal(report: &InternalCrawlReport) {
    println!("\nInternal links: {} page(s) visited", report.visited_count);
    if report.broken_links.is_empty() {
        println!("   ✅ No broken internal links");
        return;
    }
    print_broken_table(&report.broken_links);
    println!("   ❌ Broken: {}", report.broken_links.len());
}

fn print_external(report: &ExternalCrawlReport) {
    println!("\nExternal links: {} checked", report.checked_count);
    if !report.broken_links.is_empty() {
        print_broken_table(&report.broken_links);
        println!("   ⚠️  Broken (soft): {}", report.broken_links.len());
    } else {
        println!("   ✅ No broken external links");
    }

    if !report.skipped_links.is_empty() {
        println!("   ⏭️  Skipped: {}", report.skipped_links.len());
        for skipped in &report.skipped_links {
            println!("      {} ({})", skipped.url, skipped.reason);
        }
    }
}

// Prints broken links as a human-readable table
fn print_broken_table(links: &[BrokenLink]) {
    println!("{:<60} {:<8} {:<30}", "URL", "STATUS", "FOUND ON");
    println!("{}", "=".repeat(100));

    for link in links {
        println!(
            "{:<60} {:<8} {:<30}",
            truncate(&link.url, 57),
            link.status.to_string(),
            truncate(&link.found_on, 30)
        );
        if let Some(error) = &link.error {
            println!("    {error}");
        }
    }
}

// Truncate for display, respecting char boundaries
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}
