// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing-subscriber, to stderr)
// 3. Dispatch to the appropriate subcommand handler
// 4. Print results to stdout
// 5. Exit with proper code (0 = success, 2 = a crawl or lookup failed)
//
// Rust concepts used:
// - async/await: crawls spend their time waiting on the network and on git
// - futures::stream::buffer_unordered: several crawls in flight, bounded
// - anyhow: one error type for the binary, wrapping the library's CrawlError
// =============================================================================

mod cli; // src/cli.rs - command-line parsing

use std::collections::HashSet;

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{ApiArgs, Cli, Commands, FetchArgs};
use repo_harvest::config::CrawlConfig;
use repo_harvest::{CrawlResult, RepoCrawler};

// The #[tokio::main] attribute transforms our async main into a real main function
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins; otherwise -v means debug and the default is info
fn init_logging(verbose: bool) {
    let default = if verbose { "repo_harvest=debug" } else { "repo_harvest=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Fetch(args) => handle_fetch(args).await,
        Commands::Resolve { url, api, json } => handle_resolve(&url, api, json).await,
    }
}

// One crawl's outcome, as printed in --json mode
#[derive(Serialize)]
struct Report {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<CrawlResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// Handles the 'fetch' subcommand
async fn handle_fetch(args: FetchArgs) -> Result<i32> {
    let config = args.to_config();
    let jobs = args.jobs.max(1);

    // The same URL twice would race on one cache directory
    let mut seen = HashSet::new();
    let urls: Vec<String> = args
        .urls
        .iter()
        .filter(|url| seen.insert(url.trim().to_string()))
        .cloned()
        .collect();

    eprintln!("🔍 Crawling {} repositor{}", urls.len(), if urls.len() == 1 { "y" } else { "ies" });

    let reports: Vec<Report> = stream::iter(urls)
        .map(|url| {
            let config = config.clone();
            async move {
                let outcome = crawl_one(config, &url).await;
                match outcome {
                    Ok(result) => Report {
                        url,
                        result: Some(result),
                        error: None,
                    },
                    Err(e) => {
                        error!("{}: {:#}", url, e);
                        Report {
                            url,
                            result: None,
                            error: Some(format!("{:#}", e)),
                        }
                    }
                }
            }
        })
        .buffer_unordered(jobs)
        .collect()
        .await;

    let failed = reports.iter().filter(|r| r.error.is_some()).count();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    Ok(if failed > 0 { 2 } else { 0 })
}

// A crawler per URL, so each crawl gets its own rate-limit budget
async fn crawl_one(config: CrawlConfig, url: &str) -> Result<CrawlResult> {
    let crawler = RepoCrawler::new(config).context("invalid configuration")?;
    let result = crawler
        .crawl(url)
        .await
        .with_context(|| format!("crawling {}", url))?;
    Ok(result)
}

// Handles the 'resolve' subcommand
async fn handle_resolve(url: &str, api: ApiArgs, json: bool) -> Result<i32> {
    let config = CrawlConfig {
        api_base: api.api_base,
        token: api.token,
        ..CrawlConfig::default()
    };
    let crawler = RepoCrawler::new(config)?;
    let reference = crawler
        .resolve(url)
        .await
        .with_context(|| format!("resolving {}", url))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reference)?);
    } else {
        println!("owner:   {}", reference.owner);
        println!("repo:    {}", reference.repo);
        match &reference.git_ref {
            Some(git_ref) => println!("ref:     {} ({:?})", git_ref.name, git_ref.kind),
            None => println!("ref:     (default branch)"),
        }
        println!("subpath: {}", if reference.subpath.is_empty() { "/" } else { reference.subpath.as_str() });
        println!("clone:   {}", reference.clone_url());
    }
    Ok(0)
}

// Prints one crawl as a human-readable table
fn print_report(report: &Report) {
    println!();
    let result = match (&report.result, &report.error) {
        (Some(result), _) => result,
        (None, Some(error)) => {
            println!("❌ {}: {}", report.url, error);
            return;
        }
        (None, None) => return,
    };

    let stats = &result.stats;
    println!("📦 {} (source: {})", report.url, stats.source);
    if let Some(base) = &stats.base_path {
        println!("   paths relative to {}", base);
    }

    println!("{:<70} {:>10}", "PATH", "BYTES");
    println!("{}", "=".repeat(81));
    for (path, content) in &result.files {
        println!("{:<70} {:>10}", shorten(path, 70), content.len());
    }

    println!();
    println!("📊 Summary:");
    println!(
        "   ✅ Downloaded: {} ({} bytes)",
        stats.downloaded_count, stats.downloaded_bytes
    );
    println!("   ⏭️  Skipped: {}", stats.skipped_count);
    for skipped in &stats.skipped_files {
        println!("      {} ({:?}, {} bytes)", skipped.path, skipped.reason, skipped.size);
    }
}

// Keep the end of a long path, it is the part that tells files apart
fn shorten(path: &str, width: usize) -> String {
    let count = path.chars().count();
    if count <= width {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}
