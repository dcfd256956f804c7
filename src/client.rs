//! Resilient HTTP client for the tracker's REST API
//!
//! Every call goes through [`JiraClient::request`], which applies the retry policy from
//! [`crate::retry`] uniformly:
//! - network failures and 429/500/502/503/504 are retried with capped exponential backoff
//! - an integer `Retry-After` header replaces the computed delay for that attempt
//! - any other 4xx is returned on the first attempt
//!
//! Requests are issued one at a time; the underlying `reqwest::Client` is reused so
//! consecutive calls share pooled connections.

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::{Sleeper, TokioSleeper, is_retryable_status, parse_retry_after, with_retry};
use crate::types::{CommentPage, SearchPage};
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use url::Url;

/// Issue search endpoint (API v2)
const SEARCH_PATH: &str = "/rest/api/2/search";

/// HTTP client with retry/backoff for the tracker API
#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    /// Create a client from the scraper configuration
    ///
    /// # Errors
    /// Returns an error if the base URL does not parse or the HTTP client cannot be built
    pub fn new(config: &Config) -> Result<Self> {
        let parsed = Url::parse(config.base_url.trim())?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            retry: config.retry.clone(),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the clock used for backoff sleeps
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request with the retry policy applied
    ///
    /// Returns the response for any 2xx/3xx status. Transient failures are retried up to
    /// the configured budget, after which the last error is returned as-is.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        with_retry(&self.retry, self.sleeper.as_ref(), || {
            self.send_once(method.clone(), &url, query)
        })
        .await
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response> {
        let response = self.http.request(method, url).query(query).send().await?;
        let status = response.status();

        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }

        let retry_after = if is_retryable_status(status.as_u16()) {
            response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
        } else {
            None
        };

        Err(Error::Http {
            status: status.as_u16(),
            url: response.url().to_string(),
            retry_after,
        })
    }

    /// Fetch one page of issues matching `jql`
    pub async fn search_issues(
        &self,
        jql: &str,
        start_at: u64,
        max_results: u32,
        fields: &[String],
    ) -> Result<SearchPage> {
        let mut query = vec![
            ("jql", jql.to_string()),
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }

        let response = self.request(Method::GET, SEARCH_PATH, &query).await?;
        decode(response).await
    }

    /// Fetch one page of comments for an issue
    pub async fn get_issue_comments(
        &self,
        issue_key: &str,
        start_at: u64,
        max_results: u32,
    ) -> Result<CommentPage> {
        let path = format!(
            "/rest/api/2/issue/{}/comment",
            urlencoding::encode(issue_key)
        );
        let query = [
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
        ];

        let response = self.request(Method::GET, &path, &query).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let url = response.url().to_string();
    response
        .json::<T>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("{url}: {e}")))
}
