//! GitHub access: pull-request URL parsing and the REST client.

pub mod client;
pub mod url;

pub use client::{GitHubClient, PullRequestMetadata, DEFAULT_API_URL};
pub use url::{parse_pull_request_url, PullRequestUrl};
