//! The assembled refactoring request: fetched pull requests plus file contents.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// A pull request fetched from GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub url: String,
    // Title and body are carried along but not rendered into the prompt yet.
    pub title: String,
    pub body: String,
    pub diff: String,
}

/// A local file and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFile {
    pub path: String,
    pub content: String,
}

impl TargetFile {
    /// Read a file from disk.
    pub fn read(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::FileRead {
            path: PathBuf::from(path),
            source,
        })?;
        Ok(Self {
            path: path.to_string(),
            content,
        })
    }
}

/// Everything needed to ask the LLM for a rewrite.
#[derive(Debug, Clone, Default)]
pub struct RefactoringRequest {
    pub user_prompt: String,
    pub tool_call_id: String,
    /// Pull requests to refer to. Only the first one is used for generation.
    pub pull_requests: Vec<PullRequest>,
    pub target_files: Vec<TargetFile>,
}

impl RefactoringRequest {
    /// The pull request rendered into the prompt.
    pub fn first_pull_request(&self) -> Option<&PullRequest> {
        self.pull_requests.first()
    }

    /// Target paths joined with `", "`.
    pub fn target_paths(&self) -> String {
        self.target_files
            .iter()
            .map(|f| f.path.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RefactoringRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let urls: Vec<&str> = self.pull_requests.iter().map(|pr| pr.url.as_str()).collect();
        let paths: Vec<&str> = self.target_files.iter().map(|t| t.path.as_str()).collect();
        write!(
            f,
            "{{UserPrompt:'{}', ToolCallID:'{}', PullRequests:{:?}, Files:{:?}}}",
            self.user_prompt, self.tool_call_id, urls, paths
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request() -> RefactoringRequest {
        RefactoringRequest {
            user_prompt: "refactor".to_string(),
            tool_call_id: "call_1".to_string(),
            pull_requests: vec![PullRequest {
                url: "https://github.com/o/r/pull/1".to_string(),
                title: "t".to_string(),
                body: String::new(),
                diff: "diff".to_string(),
            }],
            target_files: vec![
                TargetFile {
                    path: "a.go".to_string(),
                    content: "package a".to_string(),
                },
                TargetFile {
                    path: "b.go".to_string(),
                    content: "package b".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_target_paths() {
        assert_eq!(request().target_paths(), "a.go, b.go");
        assert_eq!(RefactoringRequest::default().target_paths(), "");
    }

    #[test]
    fn test_display() {
        let s = request().to_string();
        assert_eq!(
            s,
            r#"{UserPrompt:'refactor', ToolCallID:'call_1', PullRequests:["https://github.com/o/r/pull/1"], Files:["a.go", "b.go"]}"#
        );
    }

    #[test]
    fn test_read_target_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.go");
        std::fs::write(&path, "package main\n").unwrap();

        let file = TargetFile::read(path.to_str().unwrap()).unwrap();
        assert_eq!(file.content, "package main\n");

        let err = TargetFile::read(dir.path().join("gone.go").to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
