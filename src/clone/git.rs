// src/clone/git.rs
// =============================================================================
// The seam between the crawler and git.
//
// GitBackend is the small set of git operations the fallback needs. The
// real implementation, GitCli, runs the `git` binary; tests plug in a fake
// that writes fixture files instead.
//
// Shallow clones:
// - default branch or named branch: clone --depth 1 --single-branch
// - commit SHA / tag: init + fetch --depth 1 <sha> + detached checkout,
//   since `clone --branch` only accepts branch and tag names
//
// Updates never merge. One cache directory serves every ref of a
// repository, so an update fetches the requested ref (origin HEAD when
// there is none) at depth 1 and force-checks it out, whatever the clone
// was on before.
// =============================================================================

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{CrawlError, Result};
use crate::github::{GitRef, RefKind};

#[async_trait]
pub trait GitBackend: Send + Sync {
    /// Clone `url` at `git_ref` (default branch when `None`) into `dest`,
    /// keeping only the newest commit.
    async fn clone_shallow(&self, url: &str, git_ref: Option<&GitRef>, dest: &Path) -> Result<()>;

    /// Move an existing clone in `dest` to the newest commit of `git_ref`
    /// (the remote's default branch when `None`).
    async fn update(&self, dest: &Path, git_ref: Option<&GitRef>) -> Result<()>;
}

/// Runs the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCli {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run<I, S>(&self, cwd: Option<&Path>, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let description = format!(
            "{} {}",
            self.program,
            args.iter()
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );
        debug!("running {}", description);

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            // never hang on a credential prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null());
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| CrawlError::Clone {
            command: description.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CrawlError::Clone {
                command: description,
                message: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }
        Ok(())
    }

    // `what` is a branch name, a SHA, or HEAD
    async fn fetch(&self, dest: &Path, what: &str) -> Result<()> {
        self.run(Some(dest), ["fetch", "--quiet", "--depth", "1", "origin", what])
            .await
    }

    // Put the working tree on FETCH_HEAD, dropping anything left behind
    async fn checkout_fetched(&self, dest: &Path, branch: Option<&str>) -> Result<()> {
        match branch {
            Some(name) => {
                self.run(Some(dest), ["checkout", "--quiet", "--force", "-B", name, "FETCH_HEAD"])
                    .await?
            }
            None => {
                self.run(Some(dest), ["checkout", "--quiet", "--force", "--detach", "FETCH_HEAD"])
                    .await?
            }
        }
        self.run(Some(dest), ["clean", "--quiet", "-ffdx"]).await
    }

    async fn fetch_commit(&self, dest: &Path, sha: &str) -> Result<()> {
        self.fetch(dest, sha).await?;
        self.checkout_fetched(dest, None).await
    }
}

#[async_trait]
impl GitBackend for GitCli {
    async fn clone_shallow(&self, url: &str, git_ref: Option<&GitRef>, dest: &Path) -> Result<()> {
        match git_ref {
            Some(GitRef {
                name,
                kind: RefKind::Commit,
            }) => {
                tokio::fs::create_dir_all(dest).await?;
                self.run(Some(dest), ["init", "--quiet"]).await?;
                self.run(Some(dest), ["remote", "add", "origin", url]).await?;
                self.fetch_commit(dest, name).await
            }
            branch => {
                let mut args: Vec<&OsStr> = vec![
                    OsStr::new("clone"),
                    OsStr::new("--quiet"),
                    OsStr::new("--depth"),
                    OsStr::new("1"),
                    OsStr::new("--single-branch"),
                ];
                if let Some(GitRef { name, .. }) = branch {
                    args.push(OsStr::new("--branch"));
                    args.push(OsStr::new(name.as_str()));
                }
                args.push(OsStr::new(url));
                args.push(dest.as_os_str());
                self.run(None, args).await
            }
        }
    }

    async fn update(&self, dest: &Path, git_ref: Option<&GitRef>) -> Result<()> {
        match git_ref {
            Some(GitRef {
                name,
                kind: RefKind::Commit,
            }) => self.fetch_commit(dest, name).await,
            Some(GitRef { name, .. }) => {
                self.fetch(dest, name).await?;
                self.checkout_fetched(dest, Some(name.as_str())).await
            }
            None => {
                self.fetch(dest, "HEAD").await?;
                self.checkout_fetched(dest, None).await
            }
        }
    }
}
