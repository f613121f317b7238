//! Error types for the refactoring pipeline.
//!
//! Every stage returns [`Error`], which carries enough context (URL, path,
//! HTTP status) that the top-level message is readable on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the pipeline.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing API key or unusable settings.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid pull-request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{provider}: no choices in response")]
    NoResponseChoices { provider: &'static str },

    #[error("{provider}: no function call in response")]
    NoStructuredCall { provider: &'static str },

    #[error("{provider}: malformed function call arguments: {reason}")]
    MalformedArguments {
        provider: &'static str,
        reason: String,
    },

    /// Generation was requested before a target was extracted.
    #[error("{provider}: no call state, create a refactoring target first")]
    MissingCallState { provider: &'static str },

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to fetch '{url}': HTTP {status}: {body}")]
    FetchFailed {
        url: String,
        status: u16,
        body: String,
    },

    #[error("HTTP request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read file '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write content to file '{}': {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to parse markdown content: number of headings ({headings}) and code blocks ({code_blocks}) are not matched"
    )]
    StructureMismatch { headings: usize, code_blocks: usize },

    #[error("failed to render prompt template: {0}")]
    Template(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Http {
            url: url.into(),
            source,
        }
    }

    pub(crate) fn malformed(provider: &'static str, reason: impl Into<String>) -> Self {
        Error::MalformedArguments {
            provider,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = Error::FetchFailed {
            url: "https://api.github.com/repos/o/r/pulls/1".to_string(),
            status: 404,
            body: "Not Found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pulls/1"));
        assert!(msg.contains("404"));
        assert!(msg.contains("Not Found"));

        let err = Error::StructureMismatch {
            headings: 2,
            code_blocks: 1,
        };
        assert!(err.to_string().contains("not matched"));
    }

    #[test]
    fn test_file_errors_show_path() {
        let err = Error::FileRead {
            path: PathBuf::from("src/a.go"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("src/a.go"));
    }
}
