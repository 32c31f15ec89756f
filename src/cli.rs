// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - fetch:   crawl one or more repositories and print what was collected
// - resolve: show how a URL splits into owner/repo/ref/subpath
//
// The token comes from --token or the GITHUB_TOKEN environment variable.
// clap does that lookup (the `env` feature), so the library itself never
// reads the environment. The cache lives under --cache-dir, or under the
// system temp directory (TMPDIR) when the flag is absent.
//
// Rust concepts:
// - Derive macros: clap generates the parser from the struct definitions
// - Vec<String> arguments: a flag that may be repeated or given many values
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use repo_harvest::config::{
    default_cache_root, CrawlConfig, CrawlLimits, RateLimitPolicy, RetryPolicy, DEFAULT_API_BASE,
    DEFAULT_MAX_BLOBS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILE_SIZE,
};
use repo_harvest::CrawlFilter;

/// Source files worth explaining, used when no --include is given.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &[
    "*.py", "*.js", "*.jsx", "*.ts", "*.tsx", "*.go", "*.java", "*.pyi", "*.pyx", "*.c", "*.cc",
    "*.cpp", "*.h", "*.md", "*.rst", "Dockerfile", "Makefile", "*.yaml", "*.yml",
];

/// Noise directories and files, used when no --exclude is given.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "venv/*", ".venv/*", "*test*", "tests/*", "docs/*", "examples/*", "v1/*", "dist/*", "build/*",
    "experimental/*", "deprecated/*", "legacy/*", ".git/*", ".github/*", ".next/*", ".vscode/*",
    "obj/*", "bin/*", "node_modules/*", "*.log",
];

#[derive(Parser, Debug)]
#[command(
    name = "repo-harvest",
    version,
    about = "Fetch the text files of a GitHub repository, with a git clone fallback",
    long_about = "repo-harvest downloads a filtered, size-bounded subtree of text files from a GitHub \
                  repository. It uses the REST API for small repositories and falls back to a \
                  cached shallow clone for big ones or when the API is unavailable."
)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl repositories and print the collected files
    ///
    /// Example: repo-harvest fetch https://github.com/owner/repo/tree/main/src --include '*.rs'
    Fetch(FetchArgs),

    /// Resolve a repository URL without crawling it
    ///
    /// Example: repo-harvest resolve https://github.com/owner/repo/tree/feature/x/lib
    Resolve {
        /// Repository URL
        url: String,

        #[command(flatten)]
        api: ApiArgs,

        /// Output the reference as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Options shared by every subcommand that talks to the API.
#[derive(Args, Debug)]
pub struct ApiArgs {
    /// Access token, sent as `Authorization: token ...`
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// REST API root (GitHub Enterprise, or a test server)
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Repository URLs (https://host/owner/repo[/tree/ref/path] or git@host:owner/repo.git)
    #[arg(required = true)]
    pub urls: Vec<String>,

    #[command(flatten)]
    pub api: ApiArgs,

    /// Keep only files whose name matches one of these globs
    #[arg(long, num_args = 1..)]
    pub include: Vec<String>,

    /// Drop files whose path matches one of these globs
    #[arg(long, num_args = 1..)]
    pub exclude: Vec<String>,

    /// Largest file to keep, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: u64,

    /// Deepest directory level to descend into
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Blob count above which the API is skipped in favour of a clone
    #[arg(long, default_value_t = DEFAULT_MAX_BLOBS)]
    pub max_blobs: u64,

    /// Report paths relative to the requested subdirectory
    #[arg(long)]
    pub relative_paths: bool,

    /// Where persistent clones are kept
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Longest total time to sleep for rate-limit resets, in seconds
    #[arg(long, default_value_t = 30 * 60)]
    pub max_rate_limit_wait: u64,

    /// How many repositories to crawl at once
    #[arg(long, default_value_t = 4)]
    pub jobs: usize,

    /// Output results as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    /// Turn the flags into a library config.
    pub fn to_config(&self) -> CrawlConfig {
        let include: Vec<&str> = if self.include.is_empty() {
            DEFAULT_INCLUDE_PATTERNS.to_vec()
        } else {
            self.include.iter().map(String::as_str).collect()
        };
        let exclude: Vec<&str> = if self.exclude.is_empty() {
            DEFAULT_EXCLUDE_PATTERNS.to_vec()
        } else {
            self.exclude.iter().map(String::as_str).collect()
        };

        let total = Duration::from_secs(self.max_rate_limit_wait);
        let defaults = RateLimitPolicy::default();

        CrawlConfig {
            api_base: self.api.api_base.clone(),
            token: self.api.token.clone(),
            filter: CrawlFilter::new(include, exclude),
            limits: CrawlLimits {
                max_file_size: self.max_file_size,
                max_depth: self.max_depth,
                max_blobs_before_fallback: self.max_blobs,
            },
            use_relative_paths: self.relative_paths,
            cache_root: self.cache_dir.clone().unwrap_or_else(default_cache_root),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitPolicy {
                max_single_wait: defaults.max_single_wait.min(total),
                max_total_wait: total,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_apply_when_none_given() {
        let cli = Cli::parse_from(["repo-harvest", "fetch", "https://github.com/o/r"]);
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        let config = args.to_config();
        assert!(config.filter.include.contains("*.py"));
        assert!(config.filter.exclude.contains("node_modules/*"));
        assert_eq!(config.limits.max_file_size, DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_flags_map_onto_config() {
        let cli = Cli::parse_from([
            "repo-harvest",
            "fetch",
            "https://github.com/o/r",
            "https://github.com/o/s",
            "--include",
            "*.rs",
            "--max-file-size",
            "2048",
            "--relative-paths",
            "--max-rate-limit-wait",
            "60",
            "--token",
            "abc",
        ]);
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.urls.len(), 2);
        let config = args.to_config();
        assert_eq!(config.filter.include.len(), 1);
        assert!(config.filter.exclude.contains("*test*"));
        assert_eq!(config.limits.max_file_size, 2048);
        assert!(config.use_relative_paths);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.rate_limit.max_total_wait, Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_single_wait, Duration::from_secs(60));
        assert_eq!(config.cache_root, default_cache_root());
    }

    #[test]
    fn test_cache_dir_flag_sets_cache_root() {
        let cli = Cli::parse_from([
            "repo-harvest",
            "fetch",
            "https://github.com/o/r",
            "--cache-dir",
            "/srv/harvest-cache",
        ]);
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.to_config().cache_root, PathBuf::from("/srv/harvest-cache"));
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What does #[command(flatten)] do?
//    - It splices the fields of another Args struct into this one
//    - ApiArgs is written once and shows up under both fetch and resolve
//
// 2. Why Option<String> for the token?
//    - No token is a valid way to run (public repositories, lower rate limit)
//    - `env = "GITHUB_TOKEN"` fills it in when the flag is absent
//
// 3. Why `num_args = 1..`?
//    - It lets `--include '*.py' '*.md'` take several values after one flag,
//      and the flag may also be repeated
// -----------------------------------------------------------------------------
