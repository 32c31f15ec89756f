// src/clone/walk.rs
// =============================================================================
// Reads a cloned working tree with the same rules as the API walk:
// same filter, same directory pruning, same depth limit, same size limit,
// same "skip if not UTF-8". Only the transport differs.
//
// walkdir gives us entries in sorted order and lets us skip a directory's
// contents (skip_current_dir) once we decide to prune it. Symlinks are not
// followed, the root included, so the walk never leaves the clone.
// The root may also be a single file, which is then the only entry.
// =============================================================================

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::CrawlLimits;
use crate::crawl::{Collected, SkipReason};
use crate::filter::FileFilter;

/// Walks `root`, reporting every file under a key relative to `key_base`.
///
/// `key_base` is either `root` itself (relative keys) or the repository
/// root above it (repository-relative keys). When `root` is a file, the
/// relative base is its parent directory.
pub fn walk_tree(root: &Path, key_base: &Path, filter: &FileFilter, limits: CrawlLimits) -> Collected {
    let mut collected = Collected::default();
    let max = limits.max_file_size;

    let mut entries = WalkDir::new(root)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("unreadable entry while walking {}: {}", root.display(), e);
                continue;
            }
        };
        if entry.depth() == 0 && !entry.file_type().is_file() {
            continue;
        }
        let key = match relative_key(entry.path(), key_base) {
            Some(key) => key,
            None => continue,
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if entry.file_name() == ".git" || filter.prunes_dir(&key) {
                entries.skip_current_dir();
            } else if entry.depth() > limits.max_depth {
                warn!("skipping {}: exceeds max depth {}", key, limits.max_depth);
                collected.skip(key, 0, SkipReason::DepthExceeded);
                entries.skip_current_dir();
            }
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let name = entry.file_name().to_string_lossy();
        if !filter.includes(&key, &name) {
            collected.skip(key, size, SkipReason::Filtered);
            continue;
        }
        if size > max {
            debug!("skipping {}: size {} exceeds limit {}", key, size, max);
            collected.skip(key, size, SkipReason::Oversize);
            continue;
        }

        let bytes = match std::fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to read {}: {}", key, e);
                collected.skip(key, size, SkipReason::DownloadFailed);
                continue;
            }
        };
        // the file may have grown since we looked at its metadata
        if bytes.len() as u64 > max {
            collected.skip(key, bytes.len() as u64, SkipReason::Oversize);
            continue;
        }
        match String::from_utf8(bytes) {
            Ok(text) => {
                debug!("cloned and added {} ({} bytes)", key, size);
                collected.keep(key, text);
            }
            Err(e) => {
                let len = e.as_bytes().len() as u64;
                collected.skip(key, len, SkipReason::Undecodable);
            }
        }
    }

    collected
}

// `a/b/c.txt` style key, whatever the platform separator
fn relative_key(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
