// src/github/types.rs
// =============================================================================
// The slices of GitHub REST API payloads we actually read.
//
// serde ignores every field we don't name, so these stay small. Missing
// optional fields fall back to defaults instead of failing the whole page.
// =============================================================================

use serde::Deserialize;

/// `GET /repos/{owner}/{repo}`
#[derive(Debug, Deserialize)]
pub struct RepoMeta {
    pub default_branch: Option<String>,
}

/// One element of `GET /repos/{owner}/{repo}/branches`
#[derive(Debug, Deserialize)]
pub struct Branch {
    pub name: String,
}

/// `GET /repos/{owner}/{repo}/git/trees/{sha}?recursive=1`
#[derive(Debug, Deserialize)]
pub struct TreeListing {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    /// Set by GitHub when the listing was cut short (very large trees).
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct TreeEntry {
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeListing {
    pub fn blob_count(&self) -> u64 {
        self.tree.iter().filter(|e| e.kind == "blob").count() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One element of `GET /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size as reported by the listing; may lag behind the real blob.
    #[serde(default)]
    pub size: u64,
    /// Direct raw URL, absent for some entry types.
    pub download_url: Option<String>,
    /// API URL of this entry; fetching it returns the base64 body.
    pub url: Option<String>,
}

/// The contents endpoint returns an array for a directory and a single
/// object when the path names a file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentsListing {
    Many(Vec<ContentEntry>),
    One(ContentEntry),
}

impl ContentsListing {
    pub fn into_entries(self) -> Vec<ContentEntry> {
        match self {
            ContentsListing::Many(entries) => entries,
            ContentsListing::One(entry) => vec![entry],
        }
    }
}

/// A single file fetched through the API rather than its raw URL.
#[derive(Debug, Deserialize)]
pub struct FileBlob {
    pub encoding: Option<String>,
    pub content: Option<String>,
}
