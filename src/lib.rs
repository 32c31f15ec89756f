// src/lib.rs
// =============================================================================
// repo-harvest: fetch the text files of a GitHub repository (or one of its
// subdirectories), filtered by glob patterns and bounded in size, for a
// downstream pipeline that wants `(path, content)` pairs.
//
// Modules:
// - config: CrawlConfig and the limits/policies inside it
// - filter: include/exclude glob matching
// - github: REST API access (resolve, size check, contents walk)
// - clone: git clone fallback and the local tree walk
// - crawl: the state machine and the CrawlResult it produces
// - error: CrawlError
//
// Typical use:
//
//     let crawler = RepoCrawler::new(CrawlConfig::default())?;
//     let result = crawler.crawl("https://github.com/owner/repo/tree/main/src").await?;
//     for (path, content) in result.into_sequence() { ... }
// =============================================================================

pub mod clone;
pub mod config;
pub mod crawl;
pub mod error;
pub mod filter;
pub mod github;

pub use config::{CrawlConfig, CrawlLimits, RateLimitPolicy, RetryPolicy};
pub use crawl::{CrawlResult, CrawlStats, RepoCrawler, SkipReason, SkipRecord, Source};
pub use error::{CrawlError, NotFoundHint, Result};
pub use filter::CrawlFilter;
pub use github::{GitRef, RefKind, RepoReference};
