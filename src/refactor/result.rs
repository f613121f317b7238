//! Parsing the LLM's markdown answer and writing it back to disk.

use super::request::TargetFile;
use crate::error::{Error, Result};
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Raw text answer from the generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefactoringResult {
    pub raw_content: String,
}

impl RefactoringResult {
    pub fn new(raw_content: impl Into<String>) -> Self {
        Self {
            raw_content: raw_content.into(),
        }
    }

    /// Extract `(path, content)` pairs from the markdown answer.
    pub fn target_files(&self) -> Result<Vec<TargetFile>> {
        parse_markdown_content(&self.raw_content)
    }
}

/// Pair every level-3 heading text with the code block at the same position.
///
/// Only text directly inside a heading counts: inline code, emphasis or
/// links produce no heading text of their own and split the text around
/// them into separate entries. Code blocks (fenced or indented) count only
/// when they have content. Entries are matched by index; a count mismatch
/// is an error.
pub fn parse_markdown_content(content: &str) -> Result<Vec<TargetFile>> {
    let mut headings: Vec<String> = Vec::new();
    let mut codes: Vec<String> = Vec::new();
    let mut heading: Option<HeadingText> = None;
    let mut code: Option<String> = None;

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H3,
                ..
            }) => heading = Some(HeadingText::default()),
            Event::End(TagEnd::Heading(HeadingLevel::H3)) => {
                if let Some(text) = heading.take() {
                    headings.extend(text.finish());
                }
            }
            Event::Start(Tag::CodeBlock(_)) => code = Some(String::new()),
            Event::End(TagEnd::CodeBlock) => {
                if let Some(text) = code.take().filter(|text| !text.is_empty()) {
                    codes.push(text);
                }
            }
            Event::Text(text) => {
                if let Some(ref mut buf) = code {
                    buf.push_str(&text);
                } else if let Some(ref mut h) = heading {
                    h.text(&text);
                }
            }
            Event::Start(_) => {
                if let Some(ref mut h) = heading {
                    h.enter();
                }
            }
            Event::End(_) => {
                if let Some(ref mut h) = heading {
                    h.leave();
                }
            }
            _ => {
                if let Some(ref mut h) = heading {
                    h.interrupt();
                }
            }
        }
    }

    debug!(
        "Parsed {} headings and {} code blocks",
        headings.len(),
        codes.len()
    );

    if headings.len() != codes.len() {
        return Err(Error::StructureMismatch {
            headings: headings.len(),
            code_blocks: codes.len(),
        });
    }

    Ok(headings
        .into_iter()
        .zip(codes)
        .map(|(path, content)| TargetFile { path, content })
        .collect())
}

/// Text runs directly inside the heading being read.
#[derive(Debug, Default)]
struct HeadingText {
    depth: usize,
    run: String,
    runs: Vec<String>,
}

impl HeadingText {
    fn text(&mut self, text: &str) {
        if self.depth == 0 {
            self.run.push_str(text);
        }
    }

    /// Close the current run at a non-text node.
    fn interrupt(&mut self) {
        if !self.run.is_empty() {
            self.runs.push(std::mem::take(&mut self.run));
        }
    }

    fn enter(&mut self) {
        if self.depth == 0 {
            self.interrupt();
        }
        self.depth += 1;
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(mut self) -> Vec<String> {
        self.interrupt();
        self.runs
    }
}

/// Overwrite each existing file with its new content.
///
/// Files are opened read-write without create or truncate, so content
/// shorter than the original leaves the original's trailing bytes in place.
/// The first failure stops; files already written stay written.
pub fn apply_target_files(files: &[TargetFile], dry_run: bool) -> Result<()> {
    for file in files {
        println!("--- {} ---\n{}", file.path, file.content);

        if dry_run {
            info!("Dry run: not writing {}", file.path);
            continue;
        }

        let write_error = |source: std::io::Error| Error::FileWrite {
            path: PathBuf::from(&file.path),
            source,
        };
        let mut handle = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&file.path)
            .map_err(write_error)?;
        handle
            .write_all(file.content.as_bytes())
            .map_err(write_error)?;

        info!("Wrote {} ({} bytes)", file.path, file.content.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_two_files() {
        let md = "### a.go\n\n```go\ncode1\n```\n\n### b.go\n\n```go\ncode2\n```";
        let files = parse_markdown_content(md).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "a.go");
        assert_eq!(files[0].content, "code1\n");
        assert_eq!(files[1].path, "b.go");
        assert_eq!(files[1].content, "code2\n");
    }

    #[test]
    fn test_parse_keeps_document_order_and_ignores_other_text() {
        let md = r#"Here is the refactored code.

## Summary

Some explanation with `inline code`.

### src/z.rs

```rust
fn z() {}
```

### src/a.rs

```rust
fn a() {
    let x = 1;
}
```

### src/m.rs

    indented block
"#;
        let files = parse_markdown_content(md).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/z.rs", "src/a.rs", "src/m.rs"]);
        assert_eq!(files[1].content, "fn a() {\n    let x = 1;\n}\n");
        assert_eq!(files[2].content, "indented block\n");
    }

    #[test]
    fn test_parse_heading_without_plain_text_is_rejected() {
        for md in [
            "### `main.go`\n\n```go\nx\n```\n",
            "### **main.go**\n\n```go\nx\n```\n",
            "### [main.go](main.go)\n\n```go\nx\n```\n",
        ] {
            let err = parse_markdown_content(md).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::StructureMismatch {
                        headings: 0,
                        code_blocks: 1
                    }
                ),
                "{md:?}: {err}"
            );
        }
    }

    #[test]
    fn test_parse_heading_text_split_by_markup() {
        let md = "### a.go *and* b.go\n\n```\nx\n```\n\n```\ny\n```\n";
        let files = parse_markdown_content(md).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.go ", " b.go"]);
    }

    #[test]
    fn test_parse_empty_code_block_is_skipped() {
        let md = "### a.go\n\n```go\n```\n";
        assert!(matches!(
            parse_markdown_content(md),
            Err(Error::StructureMismatch {
                headings: 1,
                code_blocks: 0
            })
        ));
    }

    #[test]
    fn test_parse_mismatch_extra_heading() {
        let md = "### a.go\n\n```go\ncode1\n```\n\n### b.go\n\nno code here\n";
        let err = parse_markdown_content(md).unwrap_err();
        match err {
            Error::StructureMismatch {
                headings,
                code_blocks,
            } => {
                assert_eq!(headings, 2);
                assert_eq!(code_blocks, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_mismatch_extra_code_block() {
        let md = "```go\nstray\n```\n\n### a.go\n\n```go\ncode1\n```\n";
        assert!(matches!(
            parse_markdown_content(md),
            Err(Error::StructureMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_inline_code_is_not_a_block() {
        let md = "### a.go\n\n```package main```\n";
        assert!(parse_markdown_content(md).is_err());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_markdown_content("").unwrap().is_empty());
        assert!(parse_markdown_content("just prose").unwrap().is_empty());
    }

    #[test]
    fn test_apply_overwrites_without_truncating() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "0123456789").unwrap();

        let files = vec![TargetFile {
            path: path.to_str().unwrap().to_string(),
            content: "abc".to_string(),
        }];
        apply_target_files(&files, false).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "abc3456789");
    }

    #[test]
    fn test_apply_longer_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "old").unwrap();

        let files = vec![TargetFile {
            path: path.to_str().unwrap().to_string(),
            content: "package main\n".to_string(),
        }];
        apply_target_files(&files, false).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "package main\n");
    }

    #[test]
    fn test_apply_does_not_create_files() {
        let dir = TempDir::new().unwrap();
        let written = dir.path().join("a.go");
        std::fs::write(&written, "old").unwrap();
        let missing = dir.path().join("missing.go");

        let files = vec![
            TargetFile {
                path: written.to_str().unwrap().to_string(),
                content: "new".to_string(),
            },
            TargetFile {
                path: missing.to_str().unwrap().to_string(),
                content: "x".to_string(),
            },
        ];
        let err = apply_target_files(&files, false).unwrap_err();

        assert!(matches!(err, Error::FileWrite { .. }));
        assert!(!missing.exists());
        // No rollback of files written before the failure.
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "new");
    }

    #[test]
    fn test_apply_dry_run_leaves_files_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        std::fs::write(&path, "old").unwrap();

        let files = vec![TargetFile {
            path: path.to_str().unwrap().to_string(),
            content: "new".to_string(),
        }];
        apply_target_files(&files, true).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn test_result_target_files() {
        let result = RefactoringResult::new("### x.rs\n\n```rust\nfn x() {}\n```\n");
        let files = result.target_files().unwrap();
        assert_eq!(files[0].path, "x.rs");
    }
}
