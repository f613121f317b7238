//! The refactoring target extracted from the user's prompt.

use crate::error::{Error, Result};
use crate::github::parse_pull_request_url;
use std::fs;

/// Pull requests to refer to and files to rewrite, as chosen by the LLM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefactoringTarget {
    /// Message given by the user.
    pub user_prompt: String,
    /// Id of the first function call; empty for providers without call ids.
    pub tool_call_id: String,
    pub pull_request_urls: Vec<String>,
    pub files: Vec<String>,
}

impl RefactoringTarget {
    pub fn new(user_prompt: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            tool_call_id: tool_call_id.into(),
            ..Self::default()
        }
    }

    /// Append the URLs and files of another function call.
    pub fn extend(&mut self, urls: Vec<String>, files: Vec<String>) {
        self.pull_request_urls.extend(urls);
        self.files.extend(files);
    }

    /// Sort and deduplicate URLs and files.
    pub fn unique(mut self) -> Self {
        self.pull_request_urls.sort();
        self.pull_request_urls.dedup();
        self.files.sort();
        self.files.dedup();
        self
    }

    /// Check every URL parses and every file exists. Stops at the first problem.
    pub fn validate(&self) -> Result<()> {
        for url in &self.pull_request_urls {
            parse_pull_request_url(url).map_err(|e| {
                Error::Validation(format!("failed to parse pull-request URL '{}': {}", url, e))
            })?;
        }

        for file in &self.files {
            if file.is_empty() {
                return Err(Error::Validation(
                    "empty file name is not allowed".to_string(),
                ));
            }
            fs::metadata(file).map_err(|e| {
                Error::Validation(format!(
                    "file '{}' doesn't exist or is not accessible: {}",
                    file, e
                ))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PR1: &str = "https://github.com/oinume/co-refactorer/pull/1";
    const PR2: &str = "https://github.com/oinume/co-refactorer/pull/2";

    fn target(urls: &[&str], files: &[&str]) -> RefactoringTarget {
        RefactoringTarget {
            user_prompt: "prompt".to_string(),
            tool_call_id: "call_1".to_string(),
            pull_request_urls: urls.iter().map(|s| s.to_string()).collect(),
            files: files.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_unique_dedups_and_sorts() {
        let got = target(&[PR1, PR1], &["a.go", "b.go", "a.go"]).unique();
        assert_eq!(got.pull_request_urls, vec![PR1]);
        assert_eq!(got.files, vec!["a.go", "b.go"]);
        assert_eq!(got.user_prompt, "prompt");
        assert_eq!(got.tool_call_id, "call_1");
    }

    #[test]
    fn test_unique_is_idempotent() {
        let once = target(&[PR2, PR1, PR2], &["z.rs", "a.rs", "m.rs", "a.rs"]).unique();
        let twice = once.clone().unique();
        assert_eq!(once, twice);
        assert_eq!(once.pull_request_urls, vec![PR1, PR2]);
        assert_eq!(once.files, vec!["a.rs", "m.rs", "z.rs"]);
    }

    #[test]
    fn test_extend_concatenates() {
        let mut t = RefactoringTarget::new("p", "id");
        t.extend(vec![PR1.to_string()], vec!["a.go".to_string()]);
        t.extend(vec![PR1.to_string()], vec!["b.go".to_string()]);
        assert_eq!(t.pull_request_urls.len(), 2);
        assert_eq!(t.files, vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_validate_ok() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.go");
        std::fs::write(&file, "package main").unwrap();

        let t = target(&[PR1], &[file.to_str().unwrap()]);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_file_name() {
        let err = target(&[PR1], &[""]).validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("empty file name"));
    }

    #[test]
    fn test_validate_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.go");
        let err = target(&[PR1], &[missing.to_str().unwrap()])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("nope.go"));
    }

    #[test]
    fn test_validate_rejects_wrong_host() {
        let err = target(&["https://github.org/oinume/co-refactorer/pull/1"], &[])
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("github.org"));
    }
}
