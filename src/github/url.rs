//! Pull-request URL parsing.

use crate::error::{Error, Result};
use reqwest::Url;
use std::fmt;

/// Components of a GitHub pull-request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestUrl {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl fmt::Display for PullRequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Parse a GitHub pull-request URL.
///
/// The URL looks like `https://github.com/{owner}/{repo}/pull/{number}`.
/// Segments after the number (`/files`, `/commits`) are ignored. Only the
/// `https` scheme and the `github.com` host are accepted.
pub fn parse_pull_request_url(url: &str) -> Result<PullRequestUrl> {
    let invalid = |reason: &str| Error::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;

    if parsed.scheme() != "https" {
        return Err(invalid("URL scheme must be https"));
    }
    // TODO: make the host configurable for GitHub Enterprise
    if parsed.host_str() != Some("github.com") {
        return Err(invalid("URL hostname must be github.com"));
    }

    let segments: Vec<&str> = parsed.path().trim_matches('/').split('/').collect();

    if segments.len() < 4 || segments[2] != "pull" {
        return Err(invalid("URL format is incorrect"));
    }

    let number = segments[3];
    if !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("pull-request number must be decimal digits"));
    }
    let number = number
        .parse::<u64>()
        .map_err(|e| invalid(&format!("pull-request number: {}", e)))?;

    Ok(PullRequestUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        number,
    })
}
