//! Prompt template rendered for the generation call.
//!
//! Templates use `{{name}}` placeholders. Recognized names are
//! `pull_request_url`, `diff`, `target_files` and `target_paths`; unknown
//! placeholders are left untouched.

use crate::error::{Error, Result};
use crate::refactor::{RefactoringRequest, TargetFile};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

const DEFAULT_TEMPLATE: &str = include_str!("default_template.md");

/// Immutable prompt template, loaded once at startup.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load a template file, or the embedded default when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                info!("Loading prompt template from: {}", path.display());
                let text = fs::read_to_string(path).map_err(|source| Error::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok(Self::new(text))
            }
            None => Ok(Self::default()),
        }
    }

    /// Render the assistant message for a request.
    ///
    /// Only the first pull request is rendered, even when the request
    /// carries several.
    pub fn render(&self, request: &RefactoringRequest) -> Result<String> {
        let pr = request
            .first_pull_request()
            .ok_or_else(|| Error::Template("no pull request to refer to".to_string()))?;

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("pull_request_url", pr.url.clone());
        vars.insert("diff", pr.diff.clone());
        vars.insert("target_files", render_target_files(&request.target_files));
        vars.insert("target_paths", request.target_paths());

        Ok(substitute(&self.text, &vars))
    }
}

/// Render each file as a `### path` heading followed by a fenced block.
fn render_target_files(files: &[TargetFile]) -> String {
    let mut out = String::new();
    for file in files {
        let fence = fence_for(&file.content);
        out.push_str(&format!("### {}\n\n{}\n", file.path, fence));
        out.push_str(&file.content);
        if !file.content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&fence);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

/// Single pass substitution, so values containing `{{...}}` are never re-expanded.
fn substitute(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
