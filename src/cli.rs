//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and prompt input.

use crate::agent::Provider;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

/// corefactor - apply a GitHub pull request's change to your own files with an LLM
///
/// Describe the refactoring in plain words, mention the pull request to
/// follow and the files to change. The LLM picks them out, reads the PR
/// diff, and rewrites the files in place.
///
/// Examples:
///   corefactor --prompt "Apply https://github.com/owner/repo/pull/12 to src/db.go"
///   corefactor --prompt-file prompt.txt --model gemini-1.5-pro
///   echo "..." | corefactor --provider claude --dry-run
///   corefactor --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Prompt for the LLM
    ///
    /// When neither --prompt nor --prompt-file is given, the prompt is read from stdin.
    #[arg(short, long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// File containing the prompt
    #[arg(long, value_name = "FILE")]
    pub prompt_file: Option<PathBuf>,

    /// LLM model to use
    ///
    /// Defaults to gpt-4o-mini, or the selected provider's default model.
    #[arg(short, long, env = "COREFACTOR_MODEL")]
    pub model: Option<String>,

    /// Temperature for LLM responses (0.0 - 2.0, default 0.7)
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// LLM provider
    ///
    /// Inferred from the model name, then from which API key is set.
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Prompt template file replacing the built-in one
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .corefactor.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the rewritten files without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Generate a default .corefactor.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    ///
    /// `--help` and `--version` print and exit 0. Any other parse error is
    /// printed and exits 1.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(args) => args,
            Err(e) if !e.use_stderr() => e.exit(),
            Err(e) => {
                // Printing to stderr only fails when stderr is gone.
                let _ = e.print();
                std::process::exit(1);
            }
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings and `DEBUG=true`.
    pub fn log_level(&self) -> tracing::Level {
        let debug_env = std::env::var("DEBUG").is_ok_and(|v| v == "true");
        self.log_level_with(debug_env)
    }

    fn log_level_with(&self, debug_env: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || debug_env {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Read the prompt: --prompt, then --prompt-file, then `stdin`.
    ///
    /// An empty flag value counts as not given.
    pub fn read_prompt<R: Read>(&self, mut stdin: R) -> Result<String> {
        let prompt_flag = self.prompt.as_deref().filter(|p| !p.is_empty());
        let prompt_file = self
            .prompt_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty());

        let prompt = if let Some(prompt) = prompt_flag {
            prompt.to_string()
        } else if let Some(path) = prompt_file {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?
        } else {
            let mut buf = String::new();
            stdin
                .read_to_string(&mut buf)
                .context("Failed to read prompt from stdin")?;
            buf
        };

        if prompt.trim().is_empty() {
            anyhow::bail!("Prompt is empty");
        }
        Ok(prompt)
    }
}
