// src/clone/mod.rs
// =============================================================================
// The fallback strategy: get the repository onto local disk with git and
// read it from there.
//
// Two flavours:
// - cached (HTTPS URLs): one shallow clone per repository under
//   <cache_root>/<owner>_<repo>, reused and moved to the requested ref on
//   later runs (a cache that can't be updated is cloned again)
// - ephemeral (SSH / .git URLs): a throwaway clone in a temp directory,
//   deleted as soon as the walk is done
//
// There is nothing to fall back to after this, so every git failure is
// returned to the caller as CrawlError::Clone.
//
// The subpath is resolved on disk before walking. If resolving it goes
// through a symlink it is treated as missing, the same as the API walk,
// which never follows symlink entries.
// =============================================================================

mod git;
mod walk;

pub use git::{GitBackend, GitCli};
pub use walk::walk_tree;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::CrawlLimits;
use crate::crawl::Collected;
use crate::error::{CrawlError, NotFoundHint, Result};
use crate::filter::FileFilter;
use crate::github::RepoReference;

/// What happened to the cache directory on this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    Cloned,
    Updated,
}

pub struct CloneFallback<'a> {
    backend: &'a dyn GitBackend,
    cache_root: &'a Path,
    filter: &'a FileFilter,
    limits: CrawlLimits,
    use_relative_paths: bool,
}

impl<'a> CloneFallback<'a> {
    pub fn new(
        backend: &'a dyn GitBackend,
        cache_root: &'a Path,
        filter: &'a FileFilter,
        limits: CrawlLimits,
        use_relative_paths: bool,
    ) -> Self {
        Self {
            backend,
            cache_root,
            filter,
            limits,
            use_relative_paths,
        }
    }

    /// Where the persistent clone of `reference` lives.
    pub fn cache_dir(&self, reference: &RepoReference) -> PathBuf {
        self.cache_root.join(reference.cache_key())
    }

    /// Clone (or update) the cached copy and walk the requested subtree.
    pub async fn crawl_cached(&self, reference: &RepoReference) -> Result<(Collected, CacheAction)> {
        let dest = self.cache_dir(reference);
        let url = reference.clone_url();

        let updated = if dest.exists() {
            info!(
                "updating cached clone {} to {}",
                dest.display(),
                reference.ref_name().unwrap_or("the default branch")
            );
            match self.backend.update(&dest, reference.git_ref.as_ref()).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("could not update {}, cloning again: {}", dest.display(), e);
                    tokio::fs::remove_dir_all(&dest).await?;
                    false
                }
            }
        } else {
            false
        };

        let action = if updated {
            CacheAction::Updated
        } else {
            tokio::fs::create_dir_all(self.cache_root).await?;
            info!("cloning {} into cache {} (shallow)", url, dest.display());
            if let Err(e) = self
                .backend
                .clone_shallow(&url, reference.git_ref.as_ref(), &dest)
                .await
            {
                // don't leave a half-made clone for the next run to "update"
                let _ = tokio::fs::remove_dir_all(&dest).await;
                return Err(e);
            }
            CacheAction::Cloned
        };

        let dest = tokio::fs::canonicalize(&dest).await?;
        let subpath = reference.subpath.trim_matches('/');
        let root = resolve_subpath(&dest, subpath).await?;
        let key_base = match (self.use_relative_paths, root.parent()) {
            (true, Some(parent)) if root.is_file() => parent.to_path_buf(),
            (true, _) => root.clone(),
            (false, _) => dest.clone(),
        };

        let collected = self.walk(root, key_base).await?;
        Ok((collected, action))
    }

    /// Clone into a temporary directory, walk it, and throw it away.
    pub async fn crawl_ephemeral(&self, url: &str) -> Result<Collected> {
        let temp = tempfile::Builder::new().prefix("repo-harvest-").tempdir()?;
        let dest = temp.path().join("repo");

        info!("cloning {} to temp dir {}", url, temp.path().display());
        self.backend.clone_shallow(url, None, &dest).await?;

        let collected = self.walk(dest.clone(), dest).await?;
        // `temp` is dropped here, removing the clone
        Ok(collected)
    }

    // The walk is blocking filesystem work; keep it off the async workers
    async fn walk(&self, root: PathBuf, key_base: PathBuf) -> Result<Collected> {
        let filter = self.filter.clone();
        let limits = self.limits;
        tokio::task::spawn_blocking(move || walk_tree(&root, &key_base, &filter, limits))
            .await
            .map_err(|e| CrawlError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}

// `dest` must already be canonical. The subpath may name a directory or a
// single file, but no symlink anywhere along the way.
async fn resolve_subpath(dest: &Path, subpath: &str) -> Result<PathBuf> {
    if subpath.is_empty() {
        return Ok(dest.to_path_buf());
    }
    let missing = || CrawlError::AuthOrNotFound {
        path: subpath.to_string(),
        hint: NotFoundHint::MissingPath,
    };

    let joined = dest.join(subpath);
    let root = tokio::fs::canonicalize(&joined).await.map_err(|_| missing())?;
    if root != joined || !root.starts_with(dest) || root.starts_with(dest.join(".git")) {
        warn!("subpath {} resolves to {}, outside the plain tree", subpath, root.display());
        return Err(missing());
    }
    let meta = tokio::fs::metadata(&root).await.map_err(|_| missing())?;
    if meta.is_dir() || meta.is_file() {
        Ok(root)
    } else {
        Err(missing())
    }
}
