// src/filter.rs
// =============================================================================
// Decides which files make it into the crawl.
//
// The rule, written down once so nobody "fixes" it by accident:
//
//   include(path, name) =
//       (no include patterns OR name matches an include pattern)
//       AND path matches no exclude pattern
//
// Include patterns are matched against the BASENAME so that "*.py" means
// "every Python file anywhere". Exclude patterns are matched against the
// FULL RELATIVE PATH so that "tests/*" or "node_modules/*" can drop whole
// directories. Swapping the two arguments silently breaks both use cases.
//
// Matching is shell-glob, like fnmatch: `*` and `?` also match `/`, so
// "*test*" excludes "src/test_utils.py" as well as "tests/a.py".
// =============================================================================

use std::collections::BTreeSet;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, Result};

/// Raw patterns as the caller wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlFilter {
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl CrawlFilter {
    pub fn new<I, E, S>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Compile the patterns. Fails on the first malformed glob.
    pub fn compile(&self) -> Result<FileFilter> {
        Ok(FileFilter {
            include: build_globset(&self.include)?,
            exclude: build_globset(&self.exclude)?,
        })
    }
}

/// Compiled form of [`CrawlFilter`], cheap to query per file.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl FileFilter {
    /// A filter that lets everything through.
    pub fn allow_all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    /// `relative_path` is matched against excludes, `file_name` against includes.
    pub fn includes(&self, relative_path: &str, file_name: &str) -> bool {
        let wanted = match &self.include {
            Some(set) => set.is_match(file_name),
            None => true,
        };
        wanted && !self.is_excluded(relative_path)
    }

    /// Whether a directory can be skipped without looking inside it.
    ///
    /// Tries both `dir` and `dir/` so that a pattern written for its
    /// contents ("tests/*") also prunes the directory itself.
    pub fn prunes_dir(&self, relative_dir: &str) -> bool {
        let trimmed = relative_dir.trim_end_matches('/');
        self.is_excluded(trimmed) || self.is_excluded(&format!("{}/", trimmed))
    }

    fn is_excluded(&self, relative_path: &str) -> bool {
        match &self.exclude {
            Some(set) => set.is_match(relative_path),
            None => false,
        }
    }
}

fn build_globset(patterns: &BTreeSet<String>) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| CrawlError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|e| CrawlError::InvalidPattern {
        pattern: patterns.iter().cloned().collect::<Vec<_>>().join(", "),
        message: e.to_string(),
    })?;
    Ok(Some(set))
}

/// Last path component of a `/`-separated relative path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
