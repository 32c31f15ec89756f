// src/error.rs
// =============================================================================
// Error type for the whole crawler.
//
// Every failure that can leave the library is one variant of CrawlError.
// Some of them are fatal for the caller (a bad URL, a failed clone), while
// two of them (Transient, RateLimitExceeded) mean "the API path is not
// viable right now" and send the orchestrator to the clone fallback instead.
//
// Per-file problems (oversize, filtered, not UTF-8) never become errors at
// all. They are recorded as SkipRecords and the crawl keeps going.
//
// Rust concepts:
// - thiserror: derive Display and Error for an enum
// - #[from]: automatic conversion so `?` works on io/reqwest errors
// =============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::crawl::Source;

/// Shorthand used across the crate.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Why a 404 happened, as far as we can tell from the request we made.
///
/// GitHub answers 404 both for "does not exist" and "you may not see this",
/// so the best we can do is a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundHint {
    /// No token and the repository root itself is missing: probably private.
    LikelyPrivate,
    /// Root is missing while we guessed a default branch name.
    LikelyWrongBranch,
    /// A path inside the repository is missing or not visible to the token.
    MissingPath,
}

impl std::fmt::Display for NotFoundHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            NotFoundHint::LikelyPrivate => {
                "repository not found or private; supply a token with access to it"
            }
            NotFoundHint::LikelyWrongBranch => {
                "repository root not found; the default branch may not be the one guessed, \
                 try adding /tree/<branch> to the URL"
            }
            NotFoundHint::MissingPath => {
                "path not found in repository or token lacks access to it"
            }
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid repository URL '{0}'")]
    InvalidUrl(String),

    #[error("'{path}' matches no branch or commit in {owner}/{repo}")]
    RefNotFound {
        owner: String,
        repo: String,
        path: String,
    },

    #[error("access token contains characters not allowed in an HTTP header")]
    InvalidToken,

    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("404 for '{path}': {hint}")]
    AuthOrNotFound { path: String, hint: NotFoundHint },

    #[error("request to {url} kept failing ({})", status_text(.status))]
    Transient { url: String, status: Option<u16> },

    #[error("rate limit wait ceiling reached after sleeping {waited:?}")]
    RateLimitExceeded { waited: Duration },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("`{command}` failed: {message}")]
    Clone { command: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no files collected from repository (source: {strategy})")]
    EmptyResult { strategy: Source },
}

impl CrawlError {
    /// True for failures that mean the API path is unusable and the crawl
    /// should be retried through a local clone.
    pub fn escalates_to_clone(&self) -> bool {
        matches!(
            self,
            CrawlError::Transient { .. } | CrawlError::RateLimitExceeded { .. }
        )
    }
}

fn status_text(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("last status {}", code),
        None => "connection error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_class_errors_escalate() {
        let transient = CrawlError::Transient {
            url: "https://api.github.com/x".to_string(),
            status: Some(502),
        };
        let limited = CrawlError::RateLimitExceeded {
            waited: Duration::from_secs(60),
        };
        let bad_url = CrawlError::InvalidUrl("nope".to_string());
        let clone = CrawlError::Clone {
            command: "git clone".to_string(),
            message: "exit status 128".to_string(),
        };

        assert!(transient.escalates_to_clone());
        assert!(limited.escalates_to_clone());
        assert!(!bad_url.escalates_to_clone());
        assert!(!clone.escalates_to_clone());
    }

    #[test]
    fn test_messages_name_the_problem() {
        let err = CrawlError::AuthOrNotFound {
            path: String::new(),
            hint: NotFoundHint::LikelyPrivate,
        };
        assert!(err.to_string().contains("private"));

        let err = CrawlError::Transient {
            url: "u".to_string(),
            status: None,
        };
        assert!(err.to_string().contains("connection error"));
    }
}
