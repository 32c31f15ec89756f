// src/github/contents.rs
// =============================================================================
// Walks a repository through the GitHub contents API and downloads the
// files worth keeping.
//
// How it works:
// 1. Start with the requested subdirectory on a stack, at depth 0
// 2. Pop a directory, list it (one request)
// 3. Files: filter, size-check, download, size-check again, decode
// 4. Directories: push them at depth + 1 unless excluded or too deep
// 5. Repeat until the stack is empty
//
// An explicit stack instead of recursion keeps memory flat no matter how
// deep the tree goes, and depth is checked before pushing so a pathological
// (or cyclic, via symlinked submodules) tree can't run away with us.
//
// Failures are handled at three levels:
// - per file (filtered, too big, not UTF-8, download failed): SkipRecord
// - per directory (404 below the root, other error status): logged, skipped
// - whole walk (retries exhausted, rate-limit ceiling): Fallback outcome,
//   so the orchestrator can try a clone instead
// =============================================================================

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::session::{Capped, RetrySession};
use super::types::{ContentEntry, ContentsListing, EntryKind, FileBlob};
use super::{GitHubApi, RepoReference};
use crate::config::CrawlLimits;
use crate::crawl::{ApiOutcome, Collected, FallbackReason, SkipReason};
use crate::error::{CrawlError, NotFoundHint, Result};
use crate::filter::{base_name, FileFilter};

// Represents a directory on the work stack
#[derive(Debug, Clone)]
struct Frame {
    path: String,
    depth: usize, // 0 for the crawl root
}

// What came back from trying to download one file
enum Download {
    Bytes(Vec<u8>),
    Oversize(u64),
    Failed(String),
}

/// Depth-bounded walk of `/repos/{owner}/{repo}/contents`.
pub struct ContentsWalker<'a> {
    session: &'a RetrySession,
    api: &'a GitHubApi,
    reference: &'a RepoReference,
    filter: &'a FileFilter,
    limits: CrawlLimits,
    use_relative_paths: bool,
}

impl<'a> ContentsWalker<'a> {
    pub fn new(
        session: &'a RetrySession,
        api: &'a GitHubApi,
        reference: &'a RepoReference,
        filter: &'a FileFilter,
        limits: CrawlLimits,
        use_relative_paths: bool,
    ) -> Self {
        Self {
            session,
            api,
            reference,
            filter,
            limits,
            use_relative_paths,
        }
    }

    /// Runs the walk. Transport-class failures become `Fallback`; partial
    /// results are dropped in that case so sources never mix.
    pub async fn walk(&self) -> Result<ApiOutcome<Collected>> {
        match self.walk_frames().await {
            Ok(collected) => Ok(ApiOutcome::Done(collected)),
            Err(e) if e.escalates_to_clone() => {
                info!("API crawling failed ({}), falling back to git clone", e);
                Ok(ApiOutcome::Fallback(FallbackReason::ApiUnavailable(e.to_string())))
            }
            Err(e) => Err(e),
        }
    }

    async fn walk_frames(&self) -> Result<Collected> {
        let mut collected = Collected::default();
        let mut stack = vec![Frame {
            path: self.reference.subpath.clone(),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            let entries = match self.list(&frame).await? {
                Some(entries) => entries,
                None => continue,
            };

            for entry in entries {
                if entry.path.is_empty() {
                    continue;
                }
                let key = self.key_for(&entry.path);

                match entry.kind {
                    EntryKind::File => self.take_file(&entry, key, &mut collected).await?,
                    EntryKind::Dir => {
                        if self.filter.prunes_dir(&key) {
                            debug!("pruning excluded directory {}", key);
                            continue;
                        }
                        let depth = frame.depth + 1;
                        if depth > self.limits.max_depth {
                            warn!("skipping {}: exceeds max depth {}", key, self.limits.max_depth);
                            collected.skip(key, 0, SkipReason::DepthExceeded);
                            continue;
                        }
                        stack.push(Frame {
                            path: entry.path.clone(),
                            depth,
                        });
                    }
                    other => debug!("ignoring {:?} entry {}", other, entry.path),
                }
            }
        }

        info!(
            "API walk of {}/{} done: {} files kept, {} skipped",
            self.reference.owner,
            self.reference.repo,
            collected.files.len(),
            collected.skipped.len()
        );
        Ok(collected)
    }

    // One directory listing. None means "skip this frame, keep walking".
    async fn list(&self, frame: &Frame) -> Result<Option<Vec<ContentEntry>>> {
        let url = self.api.contents(
            &self.reference.owner,
            &self.reference.repo,
            &frame.path,
            self.reference.ref_name(),
        );
        let fetched = self.session.get(&url).await?;

        if fetched.status == StatusCode::NOT_FOUND {
            let hint = classify_not_found(
                self.session.has_token(),
                frame.path.is_empty(),
                self.reference.ref_name(),
            );
            if frame.depth == 0 {
                return Err(CrawlError::AuthOrNotFound {
                    path: frame.path.clone(),
                    hint,
                });
            }
            warn!("404 for '{}': {}", frame.path, hint);
            return Ok(None);
        }

        if !fetched.is_success() {
            warn!(
                "error fetching '{}': HTTP {} {}",
                frame.path,
                fetched.status.as_u16(),
                fetched.snippet()
            );
            return Ok(None);
        }

        match fetched.json::<ContentsListing>() {
            Ok(listing) => Ok(Some(listing.into_entries())),
            Err(e) => {
                warn!("unreadable listing for '{}': {}", frame.path, e);
                Ok(None)
            }
        }
    }

    async fn take_file(&self, entry: &ContentEntry, key: String, collected: &mut Collected) -> Result<()> {
        let name = if entry.name.is_empty() {
            base_name(&entry.path)
        } else {
            entry.name.as_str()
        };
        let max = self.limits.max_file_size;

        if !self.filter.includes(&key, name) {
            debug!("skipping {}: does not match include/exclude patterns", key);
            collected.skip(key, entry.size, SkipReason::Filtered);
            return Ok(());
        }

        if entry.size > max {
            debug!("skipping {}: reported size {} exceeds limit {}", key, entry.size, max);
            collected.skip(key, entry.size, SkipReason::Oversize);
            return Ok(());
        }

        let bytes = match self.download(entry).await {
            Ok(Download::Bytes(bytes)) => bytes,
            Ok(Download::Oversize(size)) => {
                debug!("skipping {}: actual size {} exceeds limit {}", key, size, max);
                collected.skip(key, size, SkipReason::Oversize);
                return Ok(());
            }
            Ok(Download::Failed(reason)) => {
                warn!("failed to download {}: {}", key, reason);
                collected.skip(key, entry.size, SkipReason::DownloadFailed);
                return Ok(());
            }
            Err(e) if e.escalates_to_clone() => return Err(e),
            Err(e) => {
                warn!("failed to download {}: {}", key, e);
                collected.skip(key, entry.size, SkipReason::DownloadFailed);
                return Ok(());
            }
        };

        // The listing size can be stale; trust only what we received
        let actual = bytes.len() as u64;
        if actual > max {
            debug!("skipping {}: actual size {} exceeds limit {}", key, actual, max);
            collected.skip(key, actual, SkipReason::Oversize);
            return Ok(());
        }

        match String::from_utf8(bytes) {
            Ok(text) => {
                debug!("downloaded {} ({} bytes)", key, actual);
                collected.keep(key, text);
            }
            Err(_) => {
                debug!("skipping {}: not valid UTF-8", key);
                collected.skip(key, actual, SkipReason::Undecodable);
            }
        }
        Ok(())
    }

    // Prefer the raw URL; fall back to the API entry and its base64 body.
    async fn download(&self, entry: &ContentEntry) -> Result<Download> {
        let max = self.limits.max_file_size;

        if let Some(raw) = &entry.download_url {
            return Ok(match self.session.get_capped(raw, max).await? {
                Capped::Oversize(size) => Download::Oversize(size),
                Capped::Body(fetched) if fetched.is_success() => Download::Bytes(fetched.body),
                Capped::Body(fetched) => Download::Failed(format!("HTTP {}", fetched.status.as_u16())),
            });
        }

        let api_url = match &entry.url {
            Some(url) => url,
            None => return Ok(Download::Failed("entry has no download URL".to_string())),
        };
        let fetched = self.session.get(api_url).await?;
        if !fetched.is_success() {
            return Ok(Download::Failed(format!("HTTP {}", fetched.status.as_u16())));
        }
        let blob = match fetched.json::<FileBlob>() {
            Ok(blob) => blob,
            Err(e) => return Ok(Download::Failed(e.to_string())),
        };

        match (blob.encoding.as_deref(), blob.content) {
            (Some("base64"), Some(content)) => {
                // GitHub wraps base64 bodies at 60 columns
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                let estimated = compact.len() as u64 * 3 / 4;
                if estimated > max {
                    return Ok(Download::Oversize(estimated));
                }
                Ok(match STANDARD.decode(compact.as_bytes()) {
                    Ok(bytes) => Download::Bytes(bytes),
                    Err(e) => Download::Failed(format!("bad base64: {}", e)),
                })
            }
            _ => Ok(Download::Failed("unexpected content format".to_string())),
        }
    }

    // Key under which a repository path is reported
    fn key_for(&self, repo_path: &str) -> String {
        let subpath = self.reference.subpath.trim_matches('/');
        if !self.use_relative_paths || subpath.is_empty() {
            return repo_path.to_string();
        }
        match repo_path.strip_prefix(subpath) {
            Some(rest) if rest.is_empty() => base_name(repo_path).to_string(),
            Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
            _ => repo_path.to_string(),
        }
    }
}

/// Best guess at why a listing returned 404.
pub fn classify_not_found(has_token: bool, at_repo_root: bool, ref_name: Option<&str>) -> NotFoundHint {
    if !has_token && at_repo_root {
        NotFoundHint::LikelyPrivate
    } else if at_repo_root && matches!(ref_name, Some("main") | Some("master")) {
        NotFoundHint::LikelyWrongBranch
    } else {
        NotFoundHint::MissingPath
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitPolicy, RetryPolicy};
    use crate::filter::CrawlFilter;
    use crate::github::{GitRef, RefKind};
    use mockito::{Matcher, Server, ServerGuard};
    use std::time::Duration;

    fn session() -> RetrySession {
        RetrySession::new(
            None,
            RetryPolicy {
                max_attempts: 2,
                backoff_base: Duration::from_millis(1),
            },
            RateLimitPolicy::default(),
        )
        .unwrap()
    }

    fn reference(subpath: &str) -> RepoReference {
        RepoReference {
            web_base: "https://github.com".to_string(),
            owner: "o".to_string(),
            repo: "r".to_string(),
            git_ref: None,
            subpath: subpath.to_string(),
        }
    }

    fn limits(max_file_size: u64, max_depth: usize) -> CrawlLimits {
        CrawlLimits {
            max_file_size,
            max_depth,
            max_blobs_before_fallback: 1000,
        }
    }

    fn file_entry(server: &ServerGuard, path: &str, size: u64) -> String {
        let name = base_name(path);
        format!(
            r#"{{"name":"{name}","path":"{path}","type":"file","size":{size},"download_url":"{base}/raw/{path}","url":"{base}/repos/o/r/contents/{path}"}}"#,
            name = name,
            path = path,
            size = size,
            base = server.url()
        )
    }

    fn dir_entry(path: &str) -> String {
        format!(
            r#"{{"name":"{}","path":"{}","type":"dir","size":0,"download_url":null}}"#,
            base_name(path),
            path
        )
    }

    async fn mock_listing(server: &mut ServerGuard, path: &str, entries: &[String]) -> mockito::Mock {
        let route = if path.is_empty() {
            "/repos/o/r/contents".to_string()
        } else {
            format!("/repos/o/r/contents/{}", path)
        };
        server
            .mock("GET", route.as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(format!("[{}]", entries.join(",")))
            .create_async()
            .await
    }

    async fn mock_raw(server: &mut ServerGuard, path: &str, body: impl AsRef<[u8]>) -> mockito::Mock {
        server
            .mock("GET", format!("/raw/{}", path).as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await
    }

    #[test]
    fn test_classify_not_found() {
        assert_eq!(classify_not_found(false, true, None), NotFoundHint::LikelyPrivate);
        assert_eq!(classify_not_found(true, true, Some("main")), NotFoundHint::LikelyWrongBranch);
        assert_eq!(classify_not_found(true, true, Some("develop")), NotFoundHint::MissingPath);
        assert_eq!(classify_not_found(false, false, None), NotFoundHint::MissingPath);
    }

    #[tokio::test]
    async fn test_downloads_nested_files() {
        let mut server = Server::new_async().await;
        let root = vec![file_entry(&server, "a.py", 6), dir_entry("src")];
        mock_listing(&mut server, "", &root).await;
        let src = vec![file_entry(&server, "src/b.py", 6)];
        mock_listing(&mut server, "src", &src).await;
        mock_raw(&mut server, "a.py", "a = 1\n").await;
        mock_raw(&mut server, "src/b.py", "b = 2\n").await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1000, 50), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        let mut paths: Vec<_> = collected.files.iter().map(|f| f.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["a.py", "src/b.py"]);
        assert!(collected.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_stale_reported_size_is_rechecked() {
        let mut server = Server::new_async().await;
        // listing claims 10 bytes, the blob is really 100
        let root = vec![file_entry(&server, "grown.txt", 10)];
        mock_listing(&mut server, "", &root).await;
        mock_raw(&mut server, "grown.txt", "x".repeat(100)).await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(50, 50), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        assert!(collected.files.is_empty());
        assert_eq!(collected.skipped.len(), 1);
        assert_eq!(collected.skipped[0].path, "grown.txt");
        assert_eq!(collected.skipped[0].reason, SkipReason::Oversize);
        assert_eq!(collected.skipped[0].size, 100);
    }

    #[tokio::test]
    async fn test_reported_oversize_is_not_downloaded() {
        let mut server = Server::new_async().await;
        let root = vec![file_entry(&server, "huge.txt", 5_000)];
        mock_listing(&mut server, "", &root).await;
        let raw = server
            .mock("GET", "/raw/huge.txt")
            .expect(0)
            .create_async()
            .await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1_000, 50), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        raw.assert_async().await;
        assert_eq!(collected.skipped[0].reason, SkipReason::Oversize);
        assert_eq!(collected.skipped[0].size, 5_000);
    }

    #[tokio::test]
    async fn test_base64_body_when_no_download_url() {
        let mut server = Server::new_async().await;
        let entry = format!(
            r#"{{"name":"notes.md","path":"notes.md","type":"file","size":6,"download_url":null,"url":"{}/api-blob/notes.md"}}"#,
            server.url()
        );
        mock_listing(&mut server, "", &[entry]).await;
        server
            .mock("GET", "/api-blob/notes.md")
            .with_status(200)
            .with_body(r#"{"encoding":"base64","content":"aGVs\nbG8K\n"}"#)
            .create_async()
            .await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1_000, 50), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        assert_eq!(collected.files.len(), 1);
        assert_eq!(collected.files[0].content, "hello\n");
    }

    #[tokio::test]
    async fn test_oversize_base64_body_is_not_decoded() {
        let mut server = Server::new_async().await;
        let entry = format!(
            r#"{{"name":"big.md","path":"big.md","type":"file","size":6,"download_url":null,"url":"{}/api-blob/big.md"}}"#,
            server.url()
        );
        mock_listing(&mut server, "", &[entry]).await;
        // 800 characters that are not base64: decoding them would be a download failure
        let wrapped: Vec<String> = (0..10).map(|_| "!".repeat(80)).collect();
        let blob = format!(r#"{{"encoding":"base64","content":"{}"}}"#, wrapped.join("\\n"));
        let blob_mock = server
            .mock("GET", "/api-blob/big.md")
            .with_status(200)
            .with_body(blob)
            .expect(1)
            .create_async()
            .await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(100, 50), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        assert!(collected.files.is_empty());
        assert_eq!(collected.skipped.len(), 1);
        assert_eq!(collected.skipped[0].path, "big.md");
        assert_eq!(collected.skipped[0].reason, SkipReason::Oversize);
        assert_eq!(collected.skipped[0].size, 600);
        blob_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_utf8_is_skipped() {
        let mut server = Server::new_async().await;
        let root = vec![file_entry(&server, "blob.dat", 3), file_entry(&server, "ok.txt", 2)];
        mock_listing(&mut server, "", &root).await;
        mock_raw(&mut server, "blob.dat", vec![0xffu8, 0xfe, 0x00]).await;
        mock_raw(&mut server, "ok.txt", "ok").await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1_000, 50), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        assert_eq!(collected.files.len(), 1);
        assert_eq!(collected.files[0].path, "ok.txt");
        assert_eq!(collected.skipped[0].reason, SkipReason::Undecodable);
    }

    #[tokio::test]
    async fn test_depth_guard() {
        let mut server = Server::new_async().await;
        // d1 (depth 1) / d2 (depth 2) / d3 (depth 3, beyond the limit)
        mock_listing(&mut server, "", &[dir_entry("d1")]).await;
        let d1 = vec![dir_entry("d1/d2"), file_entry(&server, "d1/one.txt", 3)];
        mock_listing(&mut server, "d1", &d1).await;
        let d2 = vec![dir_entry("d1/d2/d3"), file_entry(&server, "d1/d2/two.txt", 3)];
        mock_listing(&mut server, "d1/d2", &d2).await;
        let d3 = server
            .mock("GET", "/repos/o/r/contents/d1/d2/d3")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        mock_raw(&mut server, "d1/one.txt", "one").await;
        mock_raw(&mut server, "d1/d2/two.txt", "two").await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1_000, 2), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        d3.assert_async().await;
        assert_eq!(collected.files.len(), 2);
        assert_eq!(collected.skipped.len(), 1);
        assert_eq!(collected.skipped[0].path, "d1/d2/d3");
        assert_eq!(collected.skipped[0].reason, SkipReason::DepthExceeded);
    }

    #[tokio::test]
    async fn test_excluded_directory_is_never_listed() {
        let mut server = Server::new_async().await;
        let root = vec![dir_entry("node_modules"), file_entry(&server, "index.js", 2)];
        mock_listing(&mut server, "", &root).await;
        let pruned = server
            .mock("GET", "/repos/o/r/contents/node_modules")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        mock_raw(&mut server, "index.js", "//").await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = CrawlFilter::new(Vec::<String>::new(), vec!["node_modules/*".to_string()])
            .compile()
            .unwrap();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1_000, 50), false);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        pruned.assert_async().await;
        assert_eq!(collected.files.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_subdirectory_is_skipped_but_missing_root_is_fatal() {
        let mut server = Server::new_async().await;
        let root = vec![dir_entry("gone"), file_entry(&server, "a.txt", 1)];
        mock_listing(&mut server, "", &root).await;
        server
            .mock("GET", "/repos/o/r/contents/gone")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        mock_raw(&mut server, "a.txt", "a").await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let filter = FileFilter::allow_all();

        let reference_ok = reference("");
        let walker = ContentsWalker::new(&session, &api, &reference_ok, &filter, limits(1_000, 50), false);
        match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => assert_eq!(c.files.len(), 1),
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        }

        let reference_missing = reference("gone");
        let walker =
            ContentsWalker::new(&session, &api, &reference_missing, &filter, limits(1_000, 50), false);
        let err = walker.walk().await.unwrap_err();
        assert!(matches!(
            err,
            CrawlError::AuthOrNotFound {
                hint: NotFoundHint::MissingPath,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_exhausted_retries_become_fallback() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/o/r/contents")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let reference = reference("");
        let filter = FileFilter::allow_all();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1_000, 50), false);

        let outcome = walker.walk().await.unwrap();
        assert!(matches!(outcome, ApiOutcome::Fallback(FallbackReason::ApiUnavailable(_))));
    }

    #[tokio::test]
    async fn test_relative_keys_and_ref_query() {
        let mut server = Server::new_async().await;
        let listing = format!("[{}]", file_entry(&server, "pkg/mod.py", 4));
        let pkg = server
            .mock("GET", "/repos/o/r/contents/pkg")
            .match_query(Matcher::UrlEncoded("ref".into(), "dev".into()))
            .with_status(200)
            .with_body(listing)
            .expect(1)
            .create_async()
            .await;
        mock_raw(&mut server, "pkg/mod.py", "x=1\n").await;

        let api = GitHubApi::new(&server.url()).unwrap();
        let session = session();
        let mut reference = reference("pkg");
        reference.git_ref = Some(GitRef {
            name: "dev".to_string(),
            kind: RefKind::Branch,
        });
        let filter = CrawlFilter::new(vec!["*.py".to_string()], Vec::<String>::new())
            .compile()
            .unwrap();
        let walker = ContentsWalker::new(&session, &api, &reference, &filter, limits(1_000, 50), true);

        let collected = match walker.walk().await.unwrap() {
            ApiOutcome::Done(c) => c,
            ApiOutcome::Fallback(reason) => panic!("unexpected fallback: {}", reason),
        };
        pkg.assert_async().await;
        assert_eq!(collected.files[0].path, "mod.py");
    }
}
