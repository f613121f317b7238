//! corefactor - LLM-powered refactoring along a reference pull request
//!
//! Reads a natural-language prompt, lets the LLM pick out the pull request
//! to follow and the files to change, feeds it the PR diff and the file
//! contents, and writes the rewritten files back in place.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (configuration, LLM, GitHub, filesystem, cancellation)

mod agent;
mod app;
mod cli;
mod config;
mod error;
mod github;
mod prompt;
mod refactor;

use agent::{create_agent, Provider};
use anyhow::{Context, Result};
use app::App;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use github::GitHubClient;
use prompt::PromptTemplate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("corefactor v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match run_refactoring(args, cancel).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Refactoring failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .corefactor.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to choose the provider, model, endpoints, and prompt template.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Cancel `cancel` on Ctrl-C so in-flight requests stop.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling...");
            cancel.cancel();
        }
    });
}

/// Run the pipeline: extract, validate, assemble, generate, apply.
async fn run_refactoring(args: Args, cancel: CancellationToken) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let prompt = args.read_prompt(std::io::stdin().lock())?;
    debug!("Prompt: {}", prompt);

    let provider = config.resolve_provider(|p| env_api_key(p).is_some());
    let model = config.model_name(provider);
    let api_key = env_api_key(provider).unwrap_or_default();
    info!("Using {} model {}", provider, model);

    let agent = create_agent(config.agent_config(provider, api_key))?;

    let github_token = config
        .github
        .token
        .clone()
        .or_else(|| std::env::var("GITHUB_TOKEN").ok());
    let github = GitHubClient::new(
        &config.github.api_url,
        github_token,
        config.model.timeout_seconds,
    )?;
    if !github.is_authenticated() {
        debug!("GITHUB_TOKEN is not set, GitHub requests are unauthenticated");
    }

    let template = PromptTemplate::load(config.prompt.template.as_deref())?;

    let mut app = App::new(agent, github, template, cancel).with_progress(!args.quiet);
    debug!("App created");

    let target = app
        .create_refactoring_target(&prompt, &model, config.model.temperature)
        .await?;
    debug!("Refactoring target: {:?}", target);

    target.validate()?;

    let request = app.create_refactoring_request(&target).await?;
    debug!("Refactoring request: {}", request);

    let result = app.create_refactoring_result(&request).await?;
    debug!("Raw result:\n{}", result.raw_content);

    let files = app.apply_refactoring_result(&result, args.dry_run)?;
    if args.dry_run {
        info!("Dry run: {} file(s) not written", files.len());
    } else {
        info!("Refactored {} file(s)", files.len());
    }

    Ok(())
}

/// API key of `provider` from its environment variable, if set and non-empty.
fn env_api_key(provider: Provider) -> Option<String> {
    std::env::var(provider.api_key_env())
        .ok()
        .filter(|key| !key.is_empty())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
