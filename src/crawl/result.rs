// src/crawl/result.rs
// =============================================================================
// The records a crawl strategy produces and the single result it turns into.
//
// Both strategies (API walk and clone walk) emit the same two kinds of
// records into a Collected buffer:
//   - FileRecord: a file we kept, with its text
//   - SkipRecord: a file we looked at and left out, with the reason
//
// aggregate() folds one buffer into a CrawlResult, stamps which strategy
// produced it, and refuses to return an empty corpus.
// =============================================================================

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};
use crate::filter::CrawlFilter;

/// Which strategy produced a result. Never mixed within one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Api,
    GitClone,
    SshClone,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Api => "api",
            Source::GitClone => "git_clone",
            Source::SshClone => "ssh_clone",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Rejected by the include/exclude patterns.
    Filtered,
    /// Larger than the per-file limit (reported or actual size).
    Oversize,
    /// Directory nested deeper than the depth limit.
    DepthExceeded,
    /// Bytes are not valid UTF-8.
    Undecodable,
    /// The download itself failed for this one file.
    DownloadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub path: String,
    pub size: u64,
    pub reason: SkipReason,
}

/// Records gathered by one strategy, before aggregation.
#[derive(Debug, Default)]
pub struct Collected {
    pub files: Vec<FileRecord>,
    pub skipped: Vec<SkipRecord>,
}

impl Collected {
    pub fn keep(&mut self, path: String, content: String) {
        let size = content.len() as u64;
        self.files.push(FileRecord {
            path,
            content,
            size,
        });
    }

    pub fn skip(&mut self, path: impl Into<String>, size: u64, reason: SkipReason) {
        self.skipped.push(SkipRecord {
            path: path.into(),
            size,
            reason,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub downloaded_count: usize,
    /// Bytes of text across the kept files.
    pub downloaded_bytes: u64,
    pub skipped_count: usize,
    pub skipped_files: Vec<SkipRecord>,
    pub source: Source,
    /// Subdirectory the file keys are relative to, when relative keys were asked for.
    pub base_path: Option<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Path -> UTF-8 content, ordered by path.
    pub files: BTreeMap<String, String>,
    pub stats: CrawlStats,
}

impl CrawlResult {
    /// The ordered `(path, content)` sequence the tutorial stages consume.
    pub fn into_sequence(self) -> Vec<(String, String)> {
        self.files.into_iter().collect()
    }
}

/// Fold one strategy's records into the final result.
///
/// A path seen twice keeps its first record. Zero files is an error: the
/// downstream pipeline has nothing to work on.
pub fn aggregate(
    collected: Collected,
    source: Source,
    base_path: Option<String>,
    filter: &CrawlFilter,
) -> Result<CrawlResult> {
    let mut files = BTreeMap::new();
    let mut downloaded_bytes = 0u64;
    for record in collected.files {
        if let Entry::Vacant(slot) = files.entry(record.path) {
            downloaded_bytes += record.size;
            slot.insert(record.content);
        }
    }

    if files.is_empty() {
        return Err(CrawlError::EmptyResult { strategy: source });
    }

    let stats = CrawlStats {
        downloaded_count: files.len(),
        downloaded_bytes,
        skipped_count: collected.skipped.len(),
        skipped_files: collected.skipped,
        source,
        base_path,
        include_patterns: filter.include.iter().cloned().collect(),
        exclude_patterns: filter.exclude.iter().cloned().collect(),
    };

    Ok(CrawlResult { files, stats })
}
