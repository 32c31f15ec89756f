// src/config.rs
// =============================================================================
// Everything a crawl can be tuned with, in one place.
//
// The library never looks at environment variables or files on its own: the
// caller (our CLI, or the tutorial pipeline) builds a CrawlConfig and hands
// it over. The one exception is the system temp directory, which the OS
// locates through TMPDIR (TEMP/TMP on Windows). It backs default_cache_root()
// and the throwaway SSH clones. Set cache_root to avoid it for the cache.
//
// Defaults mirror what the crawler has always done (1 MiB files,
// depth 50, clone fallback past 1000 blobs, 5 HTTP attempts).
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::filter::CrawlFilter;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_DEPTH: usize = 50;
pub const DEFAULT_MAX_BLOBS: u64 = 1000;

/// Size and shape limits applied identically by the API walk and the clone walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlLimits {
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Deepest directory frame (the crawl root is depth 0).
    pub max_depth: usize,
    /// Blob count above which the API walk is not even attempted.
    pub max_blobs_before_fallback: u64,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            max_blobs_before_fallback: DEFAULT_MAX_BLOBS,
        }
    }
}

/// Generic retry for 429/5xx and connection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per request, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for every retry after it.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        // 2^16 seconds is already far beyond any sensible backoff
        self.backoff_base
            .saturating_mul(1u32 << retry.min(16))
    }
}

/// Ceiling on how long we are willing to sleep for GitHub's rate limiter.
///
/// The provider tells us when the limit resets; these caps stop a far-future
/// reset time from parking the crawl indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Longest single sleep we accept.
    pub max_single_wait: Duration,
    /// Longest cumulative sleep over one crawl.
    pub max_total_wait: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_single_wait: Duration::from_secs(15 * 60),
            max_total_wait: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// REST API root, without trailing slash.
    pub api_base: String,
    /// Access token sent as `Authorization: token ...`.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub filter: CrawlFilter,
    pub limits: CrawlLimits,
    /// Key files relative to the requested subdirectory instead of the repo root.
    pub use_relative_paths: bool,
    /// Parent directory of the persistent `<owner>_<repo>` clones.
    pub cache_root: PathBuf,
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            filter: CrawlFilter::default(),
            limits: CrawlLimits::default(),
            use_relative_paths: false,
            cache_root: default_cache_root(),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitPolicy::default(),
        }
    }
}

/// `<system temp>/crawl_github_cache`
///
/// `std::env::temp_dir()` honours `TMPDIR`, so this default depends on the
/// environment. Callers that need a fixed location set `cache_root` instead.
pub fn default_cache_root() -> PathBuf {
    std::env::temp_dir().join("crawl_github_cache")
}
