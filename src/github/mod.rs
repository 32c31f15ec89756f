// src/github/mod.rs
// =============================================================================
// Everything that talks to the GitHub REST API.
//
// Submodules:
// - session: HTTP transport with retry/backoff and rate-limit sleeps
// - resolve: turns a repository URL into owner/repo/ref/subpath
// - threshold: cheap "is this repo too big for the API?" pre-check
// - contents: the depth-bounded walk of the contents API
// - types: the JSON payloads we read
//
// This file also holds GitHubApi, which knows how to spell every endpoint
// we call. Keeping URL building in one place means tests can point the whole
// crawler at a mock server just by changing the base URL.
// =============================================================================

mod contents;
mod resolve;
mod session;
mod threshold;
mod types;

pub use contents::{classify_not_found, ContentsWalker};
pub use resolve::{is_ssh_url, normalize_api_url, parse_repo_url, resolve, GitRef, ParsedUrl, RefKind, RepoReference};
pub use session::{rate_limit_wait, Capped, Fetched, RetrySession};
pub use threshold::check_blob_threshold;
pub use types::{Branch, ContentEntry, ContentsListing, EntryKind, FileBlob, RepoMeta, TreeListing};

use url::Url;

use crate::error::{CrawlError, Result};

/// Endpoint builder rooted at an API base such as `https://api.github.com`.
#[derive(Debug, Clone)]
pub struct GitHubApi {
    base: Url,
}

impl GitHubApi {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(|_| CrawlError::InvalidUrl(base.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(CrawlError::InvalidUrl(base.to_string()));
        }
        Ok(Self { base })
    }

    /// `/repos/{owner}/{repo}`
    pub fn repo(&self, owner: &str, repo: &str) -> String {
        self.endpoint(&["repos", owner, repo], &[])
    }

    /// `/repos/{owner}/{repo}/branches?per_page=100`
    pub fn branches(&self, owner: &str, repo: &str) -> String {
        self.endpoint(&["repos", owner, repo, "branches"], &[("per_page", "100")])
    }

    /// `/repos/{owner}/{repo}/git/trees/{tree}` with optional `recursive=1`
    pub fn tree(&self, owner: &str, repo: &str, tree: &str, recursive: bool) -> String {
        let query: &[(&str, &str)] = if recursive { &[("recursive", "1")] } else { &[] };
        self.endpoint(&["repos", owner, repo, "git", "trees", tree], query)
    }

    /// `/repos/{owner}/{repo}/contents/{path}` with optional `ref=`
    pub fn contents(&self, owner: &str, repo: &str, path: &str, git_ref: Option<&str>) -> String {
        let mut segments = vec!["repos", owner, repo, "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        match git_ref {
            Some(name) => self.endpoint(&segments, &[("ref", name)]),
            None => self.endpoint(&segments, &[]),
        }
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.to_string()
    }
}
