//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.corefactor.toml` files.

use crate::agent::{AgentConfig, Provider};
use crate::github::DEFAULT_API_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".corefactor.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Provider endpoint overrides.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Prompt template settings.
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Provider to use. Inferred from the model name or API keys when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,

    /// Model name. Defaults to the provider's default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Temperature for target extraction.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Output token limit for the generation call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: None,
            name: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout() -> u64 {
    300
}

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL.
    #[serde(default = "default_github_url")]
    pub api_url: String,

    /// Access token. `GITHUB_TOKEN` is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_url(),
            token: None,
        }
    }
}

fn default_github_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Base URLs of the provider APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai_url")]
    pub openai_url: String,

    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,

    #[serde(default = "default_anthropic_url")]
    pub anthropic_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai_url: default_openai_url(),
            gemini_url: default_gemini_url(),
            anthropic_url: default_anthropic_url(),
        }
    }
}

fn default_openai_url() -> String {
    Provider::OpenAi.default_base_url().to_string()
}

fn default_gemini_url() -> String {
    Provider::Gemini.default_base_url().to_string()
}

fn default_anthropic_url() -> String {
    Provider::Claude.default_base_url().to_string()
}

impl ProvidersConfig {
    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => &self.openai_url,
            Provider::Gemini => &self.gemini_url,
            Provider::Claude => &self.anthropic_url,
        }
    }
}

/// Prompt template settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Template file replacing the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(provider) = args.provider {
            self.model.provider = Some(provider);
        }
        if let Some(ref model) = args.model {
            self.model.name = Some(model.clone());
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(ref template) = args.template {
            self.prompt.template = Some(template.clone());
        }
    }

    /// Pick the provider: explicit setting, then the model name, then the
    /// first provider whose API key is available.
    pub fn resolve_provider(&self, has_key: impl Fn(Provider) -> bool) -> Provider {
        if let Some(provider) = self.model.provider {
            return provider;
        }
        if let Some(provider) = self.model.name.as_deref().and_then(Provider::from_model) {
            return provider;
        }
        Provider::ALL
            .into_iter()
            .find(|p| has_key(*p))
            .unwrap_or(Provider::OpenAi)
    }

    /// Model name to use with `provider`.
    pub fn model_name(&self, provider: Provider) -> String {
        self.model
            .name
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    /// Agent settings for `provider` with the given API key.
    pub fn agent_config(&self, provider: Provider, api_key: String) -> AgentConfig {
        let mut config = AgentConfig::new(provider, api_key);
        config.base_url = self.providers.base_url(provider).to_string();
        config.max_tokens = self.model.max_tokens;
        config.timeout_seconds = self.model.timeout_seconds;
        config
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.provider, None);
        assert_eq!(config.model.temperature, 0.7);
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.model.timeout_seconds, 300);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.providers.openai_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[model]
provider = "claude"
name = "claude-3-haiku-20240307"
temperature = 0.2

[github]
api_url = "https://github.example.com/api/v3"

[providers]
anthropic_url = "http://localhost:8080/v1"

[prompt]
template = "prompts/refactor.md"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.model.provider, Some(Provider::Claude));
        assert_eq!(config.model.name.as_deref(), Some("claude-3-haiku-20240307"));
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.github.api_url, "https://github.example.com/api/v3");
        assert_eq!(config.providers.anthropic_url, "http://localhost:8080/v1");
        assert_eq!(config.providers.gemini_url, Provider::Gemini.default_base_url());
        assert_eq!(
            config.prompt.template,
            Some(PathBuf::from("prompts/refactor.md"))
        );
    }

    #[test]
    fn test_load_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[model\nname = 1").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_resolve_provider() {
        let mut config = Config::default();
        assert_eq!(config.resolve_provider(|_| false), Provider::OpenAi);
        assert_eq!(
            config.resolve_provider(|p| p == Provider::Claude),
            Provider::Claude
        );
        assert_eq!(
            config.resolve_provider(|p| p != Provider::OpenAi),
            Provider::Gemini
        );

        config.model.name = Some("gemini-1.5-pro".to_string());
        assert_eq!(config.resolve_provider(|_| true), Provider::Gemini);

        config.model.provider = Some(Provider::Claude);
        assert_eq!(config.resolve_provider(|_| true), Provider::Claude);
    }

    #[test]
    fn test_model_name_and_agent_config() {
        let mut config = Config::default();
        assert_eq!(config.model_name(Provider::Gemini), "gemini-1.5-flash");

        config.model.name = Some("gpt-4o".to_string());
        config.model.timeout_seconds = 30;
        config.providers.openai_url = "http://localhost:9000/v1".to_string();
        assert_eq!(config.model_name(Provider::OpenAi), "gpt-4o");

        let agent = config.agent_config(Provider::OpenAi, "sk".to_string());
        assert_eq!(agent.base_url, "http://localhost:9000/v1");
        assert_eq!(agent.timeout_seconds, 30);
        assert_eq!(agent.max_tokens, 4096);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[providers]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model.max_tokens, 4096);
    }
}
