//! The refactoring pipeline.
//!
//! [`App`] runs the four stages in order: extract a target with the LLM,
//! assemble the request from GitHub and the filesystem, generate the
//! rewrite, and apply it. Every network call can be interrupted through the
//! shared [`CancellationToken`].

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::github::{parse_pull_request_url, GitHubClient};
use crate::prompt::PromptTemplate;
use crate::refactor::{
    apply_target_files, PullRequest, RefactoringRequest, RefactoringResult, RefactoringTarget,
    TargetFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct App {
    agent: Box<dyn Agent>,
    github: GitHubClient,
    template: PromptTemplate,
    cancel: CancellationToken,
    show_progress: bool,
}

impl App {
    pub fn new(
        agent: Box<dyn Agent>,
        github: GitHubClient,
        template: PromptTemplate,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            agent,
            github,
            template,
            cancel,
            show_progress: true,
        }
    }

    /// Show a spinner while waiting on the LLM.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Ask the LLM which pull requests and files the prompt refers to.
    pub async fn create_refactoring_target(
        &mut self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<RefactoringTarget> {
        info!(
            "Extracting refactoring target with {} ({})",
            model,
            self.agent.provider()
        );

        let spinner = self.spinner("Asking the LLM for the refactoring target...");
        let target = with_cancel(
            &self.cancel,
            self.agent
                .create_refactoring_target(prompt, model, temperature),
        )
        .await;
        spinner.finish_and_clear();

        target
    }

    /// Fetch the target's pull requests and read its files, in target order.
    pub async fn create_refactoring_request(
        &self,
        target: &RefactoringTarget,
    ) -> Result<RefactoringRequest> {
        let mut pull_requests = Vec::with_capacity(target.pull_request_urls.len());
        for url in &target.pull_request_urls {
            let pr_url = parse_pull_request_url(url)?;
            info!("Fetching pull request {}", pr_url);

            let metadata = with_cancel(&self.cancel, self.github.fetch_pull_request(&pr_url)).await?;
            let diff = with_cancel(&self.cancel, self.github.fetch_diff(&metadata.url)).await?;
            debug!("Fetched diff of {} ({} bytes)", pr_url, diff.len());

            pull_requests.push(PullRequest {
                url: url.clone(),
                title: metadata.title,
                body: metadata.body.unwrap_or_default(),
                diff,
            });
        }

        let target_files = target
            .files
            .iter()
            .map(|path| TargetFile::read(path))
            .collect::<Result<Vec<_>>>()?;

        Ok(RefactoringRequest {
            user_prompt: target.user_prompt.clone(),
            tool_call_id: target.tool_call_id.clone(),
            pull_requests,
            target_files,
        })
    }

    /// Render the prompt template and ask the LLM for the rewritten files.
    pub async fn create_refactoring_result(
        &mut self,
        request: &RefactoringRequest,
    ) -> Result<RefactoringResult> {
        if request.pull_requests.len() > 1 {
            info!(
                "{} pull requests given, only the first one is used",
                request.pull_requests.len()
            );
        }
        let message = self.template.render(request)?;
        debug!("Assistance message:\n{}", message);

        info!("Generating refactored files for {}", request.target_paths());
        let spinner = self.spinner("Waiting for the LLM to rewrite the files...");
        let result = with_cancel(
            &self.cancel,
            self.agent.create_refactoring_result(request, &message),
        )
        .await;
        spinner.finish_and_clear();

        result
    }

    /// Parse the result and write the files back. Returns what was written.
    pub fn apply_refactoring_result(
        &self,
        result: &RefactoringResult,
        dry_run: bool,
    ) -> Result<Vec<TargetFile>> {
        let files = result.target_files()?;
        apply_target_files(&files, dry_run)?;
        Ok(files)
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

/// Await `future` unless `cancel` fires first.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = future => result,
    }
}
