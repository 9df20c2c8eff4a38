//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror, including:
//! - Building the shared HTTP client with user agent and timeouts
//! - Cancellable GET requests with fully buffered bodies
//! - Classifying failures (status vs. transport vs. cancellation)

use crate::FetchError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upper bound on connection setup, independent of the request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hops followed before a request fails
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Content-Type header value, empty when absent
    pub content_type: String,

    /// Complete response body
    pub body: Vec<u8>,
}

/// Builds an HTTP client with proper configuration
///
/// `timeout` bounds every request end to end; connection setup is bounded by
/// the smaller of `timeout` and a fixed connect timeout.
///
/// # Example
///
/// ```no_run
/// use site_mirror::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("site-mirror/0.1.0", Duration::from_secs(20)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues GET requests on behalf of workers
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Wraps an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url`, giving up as soon as `cancel` fires
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | `Ok(FetchedBody)` |
    /// | Any other status | `FetchError::Status` |
    /// | Request timeout | `FetchError::Timeout` |
    /// | DNS, connect, TLS, body read errors | `FetchError::Transport` |
    /// | Run cancelled | `FetchError::Cancelled` |
    pub async fn fetch(
        &self,
        cancel: &CancellationToken,
        url: &Url,
    ) -> Result<FetchedBody, FetchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.get(url) => result,
        }
    }

    async fn get(&self, url: &Url) -> Result<FetchedBody, FetchError> {
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.bytes().await?;

        Ok(FetchedBody {
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Returns true if a Content-Type header denotes an HTML document
pub fn is_html(content_type: &str) -> bool {
    content_type
        .trim_start()
        .to_ascii_lowercase()
        .starts_with("text/html")
}
