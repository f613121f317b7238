//! Minimal GitHub REST client for pull-request metadata and diffs.

use super::url::PullRequestUrl;
use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Default GitHub REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.diff";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Pull-request metadata as returned by `GET /repos/{owner}/{repo}/pulls/{n}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestMetadata {
    /// API URL of the pull request, used to request the diff.
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a client against `api_url`, authenticating with `token` when present.
    pub fn new(api_url: &str, token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| Error::http(api_url, e))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Whether requests carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Fetch title, body and API URL of a pull request.
    pub async fn fetch_pull_request(&self, pr: &PullRequestUrl) -> Result<PullRequestMetadata> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, pr.owner, pr.repo, pr.number
        );
        debug!("Fetching pull-request metadata: {}", url);

        let response = self.send(self.get(&url, JSON_MEDIA_TYPE), &url).await?;
        response
            .json::<PullRequestMetadata>()
            .await
            .map_err(|e| Error::http(&url, e))
    }

    /// Fetch the unified diff of a pull request from its API URL.
    pub async fn fetch_diff(&self, pr_api_url: &str) -> Result<String> {
        debug!("Fetching pull-request diff: {}", pr_api_url);

        let response = self
            .send(self.get(pr_api_url, DIFF_MEDIA_TYPE), pr_api_url)
            .await?;
        let diff = response
            .text()
            .await
            .map_err(|e| Error::http(pr_api_url, e))?;

        debug!("Received diff ({} bytes)", diff.len());
        Ok(diff)
    }

    fn get(&self, url: &str, accept: &str) -> RequestBuilder {
        let request = self
            .http
            .get(url)
            .header(USER_AGENT, concat!("corefactor/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, accept);

        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request.send().await.map_err(|e| Error::http(url, e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::FetchFailed {
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(response)
    }
}
