// src/github/session.rs
// =============================================================================
// HTTP transport for everything that talks to GitHub.
//
// Two independent retry loops live here:
//
// 1. Generic backoff. 429/500/502/503/504 and connection failures are
//    retried with an exponentially growing delay, up to max_attempts.
//    Running out of attempts is a CrawlError::Transient, which tells the
//    orchestrator to give up on the API and clone instead.
//
// 2. Rate limiting. GitHub answers 403 with "API rate limit exceeded" in
//    the body and the reset time in X-RateLimit-Reset. We sleep until
//    the reset (plus one second) and send the same request again. These
//    sleeps do not count against the backoff attempts, but their sum is
//    capped by RateLimitPolicy so a far-away reset can't hang us.
//
// Every other status is handed back untouched: a 404 or a plain 403 is the
// caller's business, and terminal for that one request only.
//
// Rust concepts:
// - AtomicU64: a counter we can bump through &self
// - tokio::time::sleep: async sleep, cancelled if the crawl future is dropped
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{RateLimitPolicy, RetryPolicy};
use crate::error::{CrawlError, Result};

const USER_AGENT: &str = concat!("repo-harvest/", env!("CARGO_PKG_VERSION"));

/// Statuses worth another try after a pause.
const TRANSIENT_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// A fully read response.
#[derive(Debug)]
pub struct Fetched {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text for log messages, cut to something readable.
    pub fn snippet(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        text.chars().take(200).collect()
    }
}

/// Outcome of a size-capped download.
#[derive(Debug)]
pub enum Capped {
    Body(Fetched),
    /// The body is larger than the cap. Holds the size we learned: the
    /// advertised Content-Length, or the bytes seen before giving up.
    Oversize(u64),
}

// One try at a URL. Transport and body errors are the loop's business.
enum Attempt {
    Done(Capped),
    Retry(u16),
    RateLimited(HeaderMap),
}

pub struct RetrySession {
    client: Client,
    retry: RetryPolicy,
    rate_limit: RateLimitPolicy,
    has_token: bool,
    // Total milliseconds slept for the rate limiter so far
    waited_ms: AtomicU64,
}

impl RetrySession {
    pub fn new(token: Option<&str>, retry: RetryPolicy, rate_limit: RateLimitPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("token {}", token))
                .map_err(|_| CrawlError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            retry,
            rate_limit,
            has_token: token.is_some(),
            waited_ms: AtomicU64::new(0),
        })
    }

    pub fn has_token(&self) -> bool {
        self.has_token
    }

    /// How long this session has slept waiting for rate-limit resets.
    pub fn rate_limit_waited(&self) -> Duration {
        Duration::from_millis(self.waited_ms.load(Ordering::Relaxed))
    }

    /// GET and read the whole body, whatever the status.
    pub async fn get(&self, url: &str) -> Result<Fetched> {
        match self.send(url, None).await? {
            Capped::Body(fetched) => Ok(fetched),
            // only a capped read stops early
            Capped::Oversize(size) => Err(CrawlError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("uncapped read of {} stopped at {} bytes", url, size),
            ))),
        }
    }

    /// GET, but stop reading a successful body once it passes `cap` bytes.
    pub async fn get_capped(&self, url: &str, cap: u64) -> Result<Capped> {
        self.send(url, Some(cap)).await
    }

    // The body read is part of the attempt, so a connection dropped halfway
    // through a body is retried like one dropped before the headers.
    async fn send(&self, url: &str, cap: Option<u64>) -> Result<Capped> {
        let mut retries = 0u32;

        loop {
            let transient_status = match self.attempt(url, cap).await {
                Ok(Attempt::Done(capped)) => return Ok(capped),
                Ok(Attempt::Retry(status)) => Some(status),
                Ok(Attempt::RateLimited(headers)) => {
                    let wait = self.admit_rate_limit_wait(&headers)?;
                    warn!(
                        url,
                        wait_secs = wait.as_secs(),
                        "rate limit exceeded, sleeping until reset"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Err(e) if is_transport_error(&e) => {
                    debug!(url, error = %e, "transport error");
                    None
                }
                Err(e) => return Err(e.into()),
            };

            retries += 1;
            if retries >= self.retry.max_attempts {
                return Err(CrawlError::Transient {
                    url: url.to_string(),
                    status: transient_status,
                });
            }
            let delay = self.retry.delay_for(retries - 1);
            debug!(url, status = ?transient_status, retry = retries, ?delay, "retrying");
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, url: &str, cap: Option<u64>) -> reqwest::Result<Attempt> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if TRANSIENT_STATUSES.contains(&status) {
            return Ok(Attempt::Retry(status.as_u16()));
        }
        if status == StatusCode::FORBIDDEN {
            let fetched = read_all(response).await?;
            if is_rate_limited(&fetched.body) {
                return Ok(Attempt::RateLimited(fetched.headers));
            }
            return Ok(Attempt::Done(Capped::Body(fetched)));
        }

        match cap {
            Some(cap) if status.is_success() => read_capped(response, cap).await.map(Attempt::Done),
            _ => Ok(Attempt::Done(Capped::Body(read_all(response).await?))),
        }
    }

    // Compute the next rate-limit sleep and charge it against the policy.
    fn admit_rate_limit_wait(&self, headers: &HeaderMap) -> Result<Duration> {
        let waited = self.rate_limit_waited();
        // None is a reset too far away to represent
        let wait = rate_limit_wait(headers, SystemTime::now())
            .filter(|wait| *wait <= self.rate_limit.max_single_wait)
            .filter(|wait| waited.saturating_add(*wait) <= self.rate_limit.max_total_wait)
            .ok_or(CrawlError::RateLimitExceeded { waited })?;

        self.waited_ms
            .fetch_add(wait.as_millis() as u64, Ordering::Relaxed);
        Ok(wait)
    }
}

async fn read_all(response: Response) -> reqwest::Result<Fetched> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(Fetched {
        status,
        headers,
        body,
    })
}

async fn read_capped(mut response: Response, cap: u64) -> reqwest::Result<Capped> {
    if let Some(advertised) = response.content_length() {
        if advertised > cap {
            return Ok(Capped::Oversize(advertised));
        }
    }

    let status = response.status();
    let headers = response.headers().clone();
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > cap {
            return Ok(Capped::Oversize(body.len() as u64));
        }
    }

    Ok(Capped::Body(Fetched {
        status,
        headers,
        body,
    }))
}

// Failures of the connection rather than of the request we built
fn is_transport_error(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() || e.is_decode()
}

fn is_rate_limited(body: &[u8]) -> bool {
    String::from_utf8_lossy(body)
        .to_lowercase()
        .contains("rate limit")
}

/// Sleep needed before retrying a rate-limited request.
///
/// `Retry-After` (seconds) wins when present; otherwise
/// `max(X-RateLimit-Reset - now, 0) + 1` seconds. `None` when the headers
/// ask for a wait no `Duration` can hold (`inf`, `1e30`).
pub fn rate_limit_wait(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    let header_f64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
    };

    let secs = match header_f64("retry-after") {
        Some(after) => after.max(0.0),
        None => {
            let reset = header_f64("x-ratelimit-reset").unwrap_or(0.0);
            let now = now
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            (reset - now).max(0.0) + 1.0
        }
    };

    Duration::try_from_secs_f64(secs).ok()
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why read the body of a 403 but not of other statuses?
//    - GitHub uses 403 for both "forbidden" and "rate limited"
//    - Only the body tells them apart, so we have to read it
//    - Once read, the body is handed back as is if it wasn't a rate limit
//
// 2. Why is the rate-limit sleep not counted as a retry attempt?
//    - It is not a failure: the provider told us exactly when to come back
//    - The policy caps it separately (single sleep and cumulative total)
// -----------------------------------------------------------------------------
