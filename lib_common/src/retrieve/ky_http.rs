//! # HTTP Retrieval Utilities
//!
//! A thin asynchronous JSON client around `reqwest`. Each request is bounded by
//! a timeout and follows redirects. Every outcome is classified into either a
//! decoded [`RawRecord`] or a [`FeedError`]; nothing panics or escapes past
//! this boundary, and the caller decides what to try next.

use std::time::Duration;

use reqwest::{redirect::Policy, Url};

use crate::error::FeedError;
use crate::RawRecord;

/// Upper bound for a single upstream request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Redirect hops followed before the request is classified as a failure.
const MAX_REDIRECTS: usize = 10;

/// A named, time-boxed JSON client for one upstream API.
///
/// The `source_name` is attached to every logged failure and every
/// [`FeedError`] so log lines say which API misbehaved.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The underlying pooled client, reused across polls.
    inner: reqwest::Client,
    /// The base URL to which all relative paths are joined. Always ends in `/`.
    base_url: Url,
    /// Short name of the upstream, e.g. `openf1`.
    source_name: String,
}

impl ApiClient {
    /// Creates a client for `base_url` whose requests give up after `timeout`.
    ///
    /// A missing trailing slash is added so relative joins keep the base path
    /// (`.../v1` + `sessions` becomes `.../v1/sessions`).
    pub fn new(source_name: &str, base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }

        let base_url = Url::parse(&normalized).map_err(|e| FeedError::InvalidUrl {
            source_name: source_name.to_string(),
            url: normalized.clone(),
            message: e.to_string(),
        })?;

        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .user_agent("RaceFeed/1.0")
            .build()
            .map_err(|e| FeedError::Transport {
                source_name: source_name.to_string(),
                url: normalized,
                message: e.to_string(),
            })?;

        Ok(Self {
            inner,
            base_url,
            source_name: source_name.to_string(),
        })
    }

    /// The upstream's short name.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` onto the base URL and appends `query` pairs (URL-encoded).
    pub fn url_for(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, FeedError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FeedError::InvalidUrl {
                source_name: self.source_name.clone(),
                url: format!("{}{}", self.base_url, path),
                message: e.to_string(),
            })?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// GETs `path` relative to the base URL and decodes the JSON body.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<RawRecord, FeedError> {
        let url = self.url_for(path, query)?;
        self.fetch_json(url).await
    }

    /// GETs an absolute URL and decodes the JSON body.
    ///
    /// Transport errors and timeouts, non-2xx statuses and undecodable bodies
    /// are all returned as `Err` and logged at `warn` with the source name.
    pub async fn fetch_json(&self, url: Url) -> Result<RawRecord, FeedError> {
        let result = self.execute(&url).await;
        match &result {
            Ok(_) => log::debug!("[{}] fetched {}", self.source_name, url),
            Err(e) => log::warn!("Request failed: {}", e),
        }
        result
    }

    async fn execute(&self, url: &Url) -> Result<RawRecord, FeedError> {
        let response = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                source_name: self.source_name.clone(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Read the body first so a dropped connection is a transport failure,
        // not a decode failure.
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, &e))?;

        serde_json::from_slice::<RawRecord>(&body).map_err(|e| FeedError::Decode {
            source_name: self.source_name.clone(),
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, url: &Url, err: &reqwest::Error) -> FeedError {
        let message = if err.is_timeout() {
            format!("timed out: {}", err)
        } else {
            err.to_string()
        };
        FeedError::Transport {
            source_name: self.source_name.clone(),
            url: url.to_string(),
            message,
        }
    }
}
