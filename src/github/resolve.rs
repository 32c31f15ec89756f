// src/github/resolve.rs
// =============================================================================
// Turns a repository URL into something we can crawl.
//
// Supported formats:
//   - https://github.com/owner/repo
//   - https://github.com/owner/repo/tree/<ref>/<subpath>
//   - github.com/owner/repo                      (scheme added)
//   - https://api.github.com/repos/owner/repo    (rewritten to the web form)
//   - git@github.com:owner/repo.git, ssh://...   (not resolved: cloned directly)
//
// The hard part is "tree/<ref>/<subpath>": branch names may themselves
// contain slashes ("feature/login"), so "tree/feature/login/src" is
// ambiguous until we know which branches exist. We ask GitHub for the
// branch list and pick the longest branch name that covers a whole number
// of leading segments. If none does, the first segment may be a commit SHA
// or tag, which we confirm with a git-trees lookup.
// =============================================================================

use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::session::RetrySession;
use super::types::Branch;
use super::GitHubApi;
use crate::error::{CrawlError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// Found in the branch list.
    Branch,
    /// A commit SHA or tag confirmed through the git-trees endpoint.
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRef {
    pub name: String,
    pub kind: RefKind,
}

/// A fully resolved repository reference. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoReference {
    /// `scheme://host` of the web front-end, used to build the clone URL.
    pub web_base: String,
    pub owner: String,
    pub repo: String,
    /// `None` means "whatever the default branch is".
    pub git_ref: Option<GitRef>,
    /// Directory inside the repository to crawl; empty for the root.
    pub subpath: String,
}

impl RepoReference {
    pub fn clone_url(&self) -> String {
        format!("{}/{}/{}.git", self.web_base, self.owner, self.repo)
    }

    /// Directory name of the persistent clone.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.owner, self.repo.replace('/', "_"))
    }

    pub fn ref_name(&self) -> Option<&str> {
        self.git_ref.as_ref().map(|r| r.name.as_str())
    }
}

/// A URL split into its parts, before any network lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub web_base: String,
    pub owner: String,
    pub repo: String,
    /// Segments after `tree/`, if the URL had them.
    pub tree_rest: Option<Vec<String>>,
}

/// SSH remotes and `.git` URLs skip the API and are cloned directly.
pub fn is_ssh_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("git@") || url.starts_with("ssh://") || url.trim_end_matches('/').ends_with(".git")
}

/// Rewrites `https://api.github.com/repos/owner/repo/...` to
/// `https://github.com/owner/repo/...`. Other URLs pass through unchanged.
pub fn normalize_api_url(url: &str) -> String {
    match url.split_once("api.github.com/repos/") {
        Some((_, rest)) => format!("https://github.com/{}", rest),
        None => url.to_string(),
    }
}

/// Parses a repository URL without touching the network.
pub fn parse_repo_url(url: &str) -> Result<ParsedUrl> {
    let normalized = normalize_api_url(url.trim());
    let with_scheme = if normalized.contains("://") {
        normalized
    } else {
        format!("https://{}", normalized)
    };

    let parsed = Url::parse(&with_scheme).map_err(|_| CrawlError::InvalidUrl(url.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| CrawlError::InvalidUrl(url.to_string()))?;
    let web_base = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };

    let parts: Vec<String> = parsed
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    if parts.len() < 2 {
        return Err(CrawlError::InvalidUrl(url.to_string()));
    }

    let owner = parts[0].clone();
    let repo = parts[1].trim_end_matches(".git").to_string();
    if owner.is_empty() || repo.is_empty() {
        return Err(CrawlError::InvalidUrl(url.to_string()));
    }

    let tree_rest = if parts.len() > 3 && parts[2] == "tree" {
        Some(parts[3..].to_vec())
    } else {
        None
    };

    Ok(ParsedUrl {
        web_base,
        owner,
        repo,
        tree_rest,
    })
}

/// Longest branch name that equals `rest` or is a `/`-bounded prefix of it.
fn match_branch<'a>(branches: &'a [String], rest: &str) -> Option<&'a str> {
    branches
        .iter()
        .filter(|name| {
            rest == name.as_str()
                || (rest.starts_with(name.as_str()) && rest[name.len()..].starts_with('/'))
        })
        .max_by_key(|name| name.len())
        .map(|name| name.as_str())
}

/// Resolves a repository URL, making at most two API calls.
pub async fn resolve(session: &RetrySession, api: &GitHubApi, url: &str) -> Result<RepoReference> {
    let parsed = parse_repo_url(url)?;

    let rest = match parsed.tree_rest {
        Some(rest) => rest,
        None => {
            // No ref in the URL: let GitHub pick the default branch
            return Ok(RepoReference {
                web_base: parsed.web_base,
                owner: parsed.owner,
                repo: parsed.repo,
                git_ref: None,
                subpath: String::new(),
            });
        }
    };

    let joined = rest.join("/");
    let branches = fetch_branch_names(session, api, &parsed.owner, &parsed.repo).await?;

    let (git_ref, subpath) = if let Some(name) = match_branch(&branches, &joined) {
        let subpath = joined[name.len()..].trim_start_matches('/').to_string();
        (
            GitRef {
                name: name.to_string(),
                kind: RefKind::Branch,
            },
            subpath,
        )
    } else if tree_exists(session, api, &parsed.owner, &parsed.repo, &rest[0]).await? {
        (
            GitRef {
                name: rest[0].clone(),
                kind: RefKind::Commit,
            },
            rest[1..].join("/"),
        )
    } else {
        return Err(CrawlError::RefNotFound {
            owner: parsed.owner,
            repo: parsed.repo,
            path: joined,
        });
    };

    debug!(owner = %parsed.owner, repo = %parsed.repo, git_ref = %git_ref.name, %subpath, "resolved reference");

    Ok(RepoReference {
        web_base: parsed.web_base,
        owner: parsed.owner,
        repo: parsed.repo,
        git_ref: Some(git_ref),
        subpath,
    })
}

// A failed listing is not fatal by itself: the ref may still be a commit.
async fn fetch_branch_names(
    session: &RetrySession,
    api: &GitHubApi,
    owner: &str,
    repo: &str,
) -> Result<Vec<String>> {
    let fetched = session.get(&api.branches(owner, repo)).await?;

    if !fetched.is_success() {
        if fetched.status == reqwest::StatusCode::NOT_FOUND && !session.has_token() {
            warn!("branch list of {}/{} not found: repository may be private, supply a token", owner, repo);
        } else {
            warn!(
                "could not list branches of {}/{}: HTTP {} {}",
                owner,
                repo,
                fetched.status.as_u16(),
                fetched.snippet()
            );
        }
        return Ok(Vec::new());
    }

    match fetched.json::<Vec<Branch>>() {
        Ok(branches) => Ok(branches.into_iter().map(|b| b.name).collect()),
        Err(e) => {
            warn!("unreadable branch list for {}/{}: {}", owner, repo, e);
            Ok(Vec::new())
        }
    }
}

async fn tree_exists(
    session: &RetrySession,
    api: &GitHubApi,
    owner: &str,
    repo: &str,
    tree: &str,
) -> Result<bool> {
    let fetched = session.get(&api.tree(owner, repo, tree, false)).await?;
    Ok(fetched.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitPolicy, RetryPolicy};
    use mockito::{Matcher, Server};

    fn session() -> RetrySession {
        RetrySession::new(None, RetryPolicy::default(), RateLimitPolicy::default()).unwrap()
    }

    #[test]
    fn test_parse_github_url() {
        let parsed = parse_repo_url("https://github.com/rust-lang/rust").unwrap();
        assert_eq!(parsed.owner, "rust-lang");
        assert_eq!(parsed.repo, "rust");
        assert_eq!(parsed.web_base, "https://github.com");
        assert!(parsed.tree_rest.is_none());
    }

    #[test]
    fn test_parse_github_url_with_git() {
        let parsed = parse_repo_url("https://github.com/user/repo.git").unwrap();
        assert_eq!(parsed.owner, "user");
        assert_eq!(parsed.repo, "repo");
    }

    #[test]
    fn test_parse_without_scheme_and_with_tree() {
        let parsed = parse_repo_url("github.com/o/r/tree/main/src/lib").unwrap();
        assert_eq!(parsed.web_base, "https://github.com");
        assert_eq!(
            parsed.tree_rest,
            Some(vec!["main".to_string(), "src".to_string(), "lib".to_string()])
        );
    }

    #[test]
    fn test_parse_invalid_url() {
        assert!(matches!(
            parse_repo_url("https://github.com/only-owner"),
            Err(CrawlError::InvalidUrl(_))
        ));
        assert!(matches!(parse_repo_url("https://github.com/"), Err(CrawlError::InvalidUrl(_))));
    }

    #[test]
    fn test_api_url_is_normalized() {
        assert_eq!(
            normalize_api_url("https://api.github.com/repos/o/r"),
            "https://github.com/o/r"
        );
        let parsed = parse_repo_url("https://api.github.com/repos/o/r").unwrap();
        assert_eq!(parsed.web_base, "https://github.com");
        assert_eq!(parsed.owner, "o");
    }

    #[test]
    fn test_ssh_detection() {
        assert!(is_ssh_url("git@github.com:o/r.git"));
        assert!(is_ssh_url("ssh://git@github.com/o/r"));
        assert!(is_ssh_url("https://github.com/o/r.git"));
        assert!(!is_ssh_url("https://github.com/o/r"));
    }

    #[test]
    fn test_match_branch_prefers_longest_whole_segments() {
        let branches = vec![
            "main".to_string(),
            "feature".to_string(),
            "feature/login".to_string(),
        ];
        assert_eq!(match_branch(&branches, "feature/login/src"), Some("feature/login"));
        assert_eq!(match_branch(&branches, "main"), Some("main"));
        assert_eq!(match_branch(&branches, "main/docs"), Some("main"));
        // "main" must not swallow "maintenance"
        assert_eq!(match_branch(&branches, "maintenance/x"), None);
    }

    #[test]
    fn test_reference_helpers() {
        let reference = RepoReference {
            web_base: "https://github.com".to_string(),
            owner: "o".to_string(),
            repo: "r".to_string(),
            git_ref: None,
            subpath: String::new(),
        };
        assert_eq!(reference.clone_url(), "https://github.com/o/r.git");
        assert_eq!(reference.cache_key(), "o_r");
        assert_eq!(reference.ref_name(), None);
    }

    #[tokio::test]
    async fn test_resolve_without_tree_makes_no_calls() {
        let api = GitHubApi::new("http://127.0.0.1:9").unwrap();
        let reference = resolve(&session(), &api, "https://github.com/o/r").await.unwrap();
        assert!(reference.git_ref.is_none());
        assert_eq!(reference.subpath, "");
    }

    #[tokio::test]
    async fn test_resolve_branch_with_slash() {
        let mut server = Server::new_async().await;
        let branches = server
            .mock("GET", "/repos/o/r/branches")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"name":"main"},{"name":"feature/login"}]"#)
            .expect(1)
            .create_async()
            .await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let reference = resolve(
            &session(),
            &api,
            "https://github.com/o/r/tree/feature/login/src/auth",
        )
        .await
        .unwrap();

        branches.assert_async().await;
        assert_eq!(
            reference.git_ref,
            Some(GitRef {
                name: "feature/login".to_string(),
                kind: RefKind::Branch
            })
        );
        assert_eq!(reference.subpath, "src/auth");
    }

    #[tokio::test]
    async fn test_resolve_commit_sha() {
        let sha = "e45a15766746d95f8cfaaa705b0371267bec812e";
        let mut server = Server::new_async().await;
        let _branches = server
            .mock("GET", "/repos/o/r/branches")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"name":"main"}]"#)
            .create_async()
            .await;
        let tree = server
            .mock("GET", format!("/repos/o/r/git/trees/{}", sha).as_str())
            .with_status(200)
            .with_body(r#"{"tree":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let url = format!("https://github.com/o/r/tree/{}/python/packages", sha);
        let reference = resolve(&session(), &api, &url).await.unwrap();

        tree.assert_async().await;
        let git_ref = reference.git_ref.unwrap();
        assert_eq!(git_ref.name, sha);
        assert_eq!(git_ref.kind, RefKind::Commit);
        assert_eq!(reference.subpath, "python/packages");
    }

    #[tokio::test]
    async fn test_resolve_unknown_ref() {
        let mut server = Server::new_async().await;
        let _branches = server
            .mock("GET", "/repos/o/r/branches")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;
        let _tree = server
            .mock("GET", "/repos/o/r/git/trees/nope")
            .with_status(404)
            .create_async()
            .await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let err = resolve(&session(), &api, "https://github.com/o/r/tree/nope/src")
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::RefNotFound { .. }));
    }
}
