//! Refactoring pipeline data: target, assembled request and result.

pub mod request;
pub mod result;
pub mod target;

pub use request::{PullRequest, RefactoringRequest, TargetFile};
pub use result::{apply_target_files, parse_markdown_content, RefactoringResult};
pub use target::RefactoringTarget;
