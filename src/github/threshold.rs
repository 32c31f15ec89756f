// src/github/threshold.rs
// =============================================================================
// Decides up front whether the API walk is worth starting.
//
// Walking the contents API costs one request per directory plus one per
// file. On a big repository that burns through the rate limit long before
// the walk finishes. One recursive tree listing tells us how many blobs
// the default branch holds for the price of two requests, so we check that
// first and go straight to a clone when the number is too high.
//
// Any trouble with the check itself also means "clone": if we can't even
// list the tree, the per-directory walk is unlikely to fare better.
// =============================================================================

use tracing::{debug, info};

use super::session::RetrySession;
use super::types::{RepoMeta, TreeListing};
use super::{GitHubApi, RepoReference};
use crate::crawl::{ApiOutcome, FallbackReason};

/// Returns `Done(blob_count)` when the API walk may proceed.
pub async fn check_blob_threshold(
    session: &RetrySession,
    api: &GitHubApi,
    reference: &RepoReference,
    max_blobs: u64,
) -> ApiOutcome<u64> {
    match count_blobs(session, api, reference).await {
        Ok((count, truncated)) if truncated => {
            info!("{}/{}: tree listing truncated at {} blobs, falling back to git clone", reference.owner, reference.repo, count);
            ApiOutcome::Fallback(FallbackReason::TooManyBlobs(count))
        }
        Ok((count, _)) if count > max_blobs => {
            info!(
                "{}/{}: {} blobs exceeds threshold of {}, falling back to git clone",
                reference.owner, reference.repo, count, max_blobs
            );
            ApiOutcome::Fallback(FallbackReason::TooManyBlobs(count))
        }
        Ok((count, _)) => {
            debug!("{}/{}: {} blobs, using the API", reference.owner, reference.repo, count);
            ApiOutcome::Done(count)
        }
        Err(message) => {
            info!("{}/{}: size check failed ({}), falling back to git clone", reference.owner, reference.repo, message);
            ApiOutcome::Fallback(FallbackReason::ThresholdCheckFailed(message))
        }
    }
}

// (blob count, truncated?) or a description of what went wrong
async fn count_blobs(
    session: &RetrySession,
    api: &GitHubApi,
    reference: &RepoReference,
) -> Result<(u64, bool), String> {
    let meta = session
        .get(&api.repo(&reference.owner, &reference.repo))
        .await
        .map_err(|e| e.to_string())?;
    if !meta.is_success() {
        return Err(format!("repository metadata: HTTP {}", meta.status.as_u16()));
    }
    let default_branch = meta
        .json::<RepoMeta>()
        .map_err(|e| format!("repository metadata: {}", e))?
        .default_branch
        .ok_or_else(|| "repository metadata has no default branch".to_string())?;

    let tree = session
        .get(&api.tree(&reference.owner, &reference.repo, &default_branch, true))
        .await
        .map_err(|e| e.to_string())?;
    if !tree.is_success() {
        return Err(format!("tree of {}: HTTP {}", default_branch, tree.status.as_u16()));
    }
    let listing = tree
        .json::<TreeListing>()
        .map_err(|e| format!("tree of {}: {}", default_branch, e))?;

    Ok((listing.blob_count(), listing.truncated))
}
