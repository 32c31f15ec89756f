// src/crawl/mod.rs
// =============================================================================
// The crawl state machine.
//
//   resolve URL -> threshold check -> API walk ------------> aggregate
//                        |                |                      ^
//                        +--- fallback ---+--> clone walk -------+
//
// - SSH / .git URLs skip straight to an ephemeral clone
// - The threshold check sends big (or unmeasurable) repositories to the clone
// - The API walk hands back Fallback when the transport gives out
// - Whatever ran last is aggregated; sources are never mixed
//
// Rust concepts:
// - Enums as explicit outcomes: ApiOutcome says "done" or "try the clone"
//   without using errors for control flow
// - Arc<dyn Trait>: the git backend is shared and swappable in tests
// =============================================================================

mod result;

pub use result::{aggregate, Collected, CrawlResult, CrawlStats, FileRecord, SkipReason, SkipRecord, Source};

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::clone::{CloneFallback, GitBackend, GitCli};
use crate::config::CrawlConfig;
use crate::error::Result;
use crate::filter::FileFilter;
use crate::github::{self, ContentsWalker, GitHubApi, RepoReference, RetrySession};

/// Result of an API-side step: finished, or hand over to the clone.
#[derive(Debug)]
pub enum ApiOutcome<T> {
    Done(T),
    Fallback(FallbackReason),
}

/// Why the API path was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The recursive tree holds this many blobs (or was truncated at it).
    TooManyBlobs(u64),
    /// The size pre-check itself could not be completed.
    ThresholdCheckFailed(String),
    /// Retries or the rate-limit budget ran out during the walk.
    ApiUnavailable(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::TooManyBlobs(count) => write!(f, "repository has {} blobs", count),
            FallbackReason::ThresholdCheckFailed(message) => write!(f, "size check failed: {}", message),
            FallbackReason::ApiUnavailable(message) => write!(f, "API unavailable: {}", message),
        }
    }
}

/// Crawls repositories with one configuration.
///
/// The rate-limit budget lives in the session, so it is shared by every
/// crawl made through the same `RepoCrawler`.
pub struct RepoCrawler {
    config: CrawlConfig,
    filter: FileFilter,
    session: RetrySession,
    api: GitHubApi,
    backend: Arc<dyn GitBackend>,
}

impl RepoCrawler {
    /// Crawler using the `git` executable for the clone fallback.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(GitCli::default()))
    }

    pub fn with_backend(config: CrawlConfig, backend: Arc<dyn GitBackend>) -> Result<Self> {
        let filter = config.filter.compile()?;
        let session = RetrySession::new(config.token.as_deref(), config.retry, config.rate_limit)?;
        let api = GitHubApi::new(&config.api_base)?;
        Ok(Self {
            config,
            filter,
            session,
            api,
            backend,
        })
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Resolve a URL into owner/repo/ref/subpath without crawling anything.
    pub async fn resolve(&self, url: &str) -> Result<RepoReference> {
        github::resolve(&self.session, &self.api, url).await
    }

    /// Fetch the filtered text files behind `url`.
    pub async fn crawl(&self, url: &str) -> Result<CrawlResult> {
        let fallback = CloneFallback::new(
            self.backend.as_ref(),
            &self.config.cache_root,
            &self.filter,
            self.config.limits,
            self.config.use_relative_paths,
        );

        if github::is_ssh_url(url) {
            info!("{} is an SSH/.git URL, cloning directly", url);
            let collected = fallback.crawl_ephemeral(url).await?;
            return aggregate(collected, Source::SshClone, None, &self.config.filter);
        }

        let reference = self.resolve(url).await?;
        let base_path = self.base_path(&reference);

        let outcome = match github::check_blob_threshold(
            &self.session,
            &self.api,
            &reference,
            self.config.limits.max_blobs_before_fallback,
        )
        .await
        {
            ApiOutcome::Done(_) => {
                ContentsWalker::new(
                    &self.session,
                    &self.api,
                    &reference,
                    &self.filter,
                    self.config.limits,
                    self.config.use_relative_paths,
                )
                .walk()
                .await?
            }
            ApiOutcome::Fallback(reason) => ApiOutcome::Fallback(reason),
        };

        match outcome {
            ApiOutcome::Done(collected) => aggregate(collected, Source::Api, base_path, &self.config.filter),
            ApiOutcome::Fallback(reason) => {
                info!("{}/{}: using git clone ({})", reference.owner, reference.repo, reason);
                let (collected, action) = fallback.crawl_cached(&reference).await?;
                info!("{}/{}: clone cache {:?}", reference.owner, reference.repo, action);
                aggregate(collected, Source::GitClone, base_path, &self.config.filter)
            }
        }
    }

    // Reported only when keys are relative to a real subdirectory
    fn base_path(&self, reference: &RepoReference) -> Option<String> {
        let subpath = reference.subpath.trim_matches('/');
        if self.config.use_relative_paths && !subpath.is_empty() {
            Some(subpath.to_string())
        } else {
            None
        }
    }
}
