//! LLM agents for the two round trips of a refactoring.
//!
//! Each provider speaks a different function-calling protocol. An [`Agent`]
//! hides that: it extracts the refactoring target with a function call,
//! keeps whatever call state its provider needs, and reuses it to ask for
//! the rewritten files.

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod tools;

pub use claude::ClaudeAgent;
pub use gemini::GeminiAgent;
pub use openai::OpenAiAgent;

use crate::error::{Error, Result};
use crate::refactor::{RefactoringRequest, RefactoringResult, RefactoringTarget};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A provider-specific LLM client that carries state between the two calls.
#[async_trait]
pub trait Agent: Send {
    /// Provider this agent talks to.
    fn provider(&self) -> Provider;

    /// Ask the LLM which pull requests and files the prompt refers to.
    async fn create_refactoring_target(
        &mut self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<RefactoringTarget>;

    /// Ask the LLM for the rewritten files.
    ///
    /// `assistance_message` is the rendered prompt template. Must be called
    /// after [`Agent::create_refactoring_target`].
    async fn create_refactoring_result(
        &mut self,
        request: &RefactoringRequest,
        assistance_message: &str,
    ) -> Result<RefactoringResult>;
}

/// Supported LLM providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions with tool calls
    #[value(name = "openai")]
    OpenAi,
    /// Google Gemini generateContent with function calling
    Gemini,
    /// Anthropic messages with tool use
    Claude,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Gemini, Provider::Claude];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Claude => "ANTHROPIC_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Gemini => "gemini-1.5-flash",
            Provider::Claude => "claude-3-5-sonnet-20240620",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Provider::Claude => "https://api.anthropic.com/v1",
        }
    }

    /// Guess the provider from a model name.
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.to_lowercase();
        if ["gpt", "o1", "o3", "o4", "chatgpt"]
            .iter()
            .any(|p| model.starts_with(p))
        {
            Some(Provider::OpenAi)
        } else if model.starts_with("gemini") {
            Some(Provider::Gemini)
        } else if model.starts_with("claude") {
            Some(Provider::Claude)
        } else {
            None
        }
    }
}

/// Connection settings for an agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: String,
    /// Output token limit for providers that require one.
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl AgentConfig {
    /// Config with the provider's default endpoint.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            api_key: api_key.into(),
            max_tokens: 4096,
            timeout_seconds: 300,
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_seconds))
            .build()
            .map_err(|e| Error::http(&self.base_url, e))
    }
}

/// Build the agent for `config.provider`.
pub fn create_agent(config: AgentConfig) -> Result<Box<dyn Agent>> {
    if config.api_key.is_empty() {
        return Err(Error::Config(format!(
            "env var {} is not defined",
            config.provider.api_key_env()
        )));
    }

    Ok(match config.provider {
        Provider::OpenAi => Box::new(OpenAiAgent::new(config)?),
        Provider::Gemini => Box::new(GeminiAgent::new(config)?),
        Provider::Claude => Box::new(ClaudeAgent::new(config)?),
    })
}

/// Send a JSON request and decode the JSON response, mapping failures to [`Error`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: Provider,
    url: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    debug!("{} API call: {}", provider, url);

    let response = request.send().await.map_err(|e| Error::http(url, e))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            provider: provider.name(),
            status,
            body,
        });
    }

    response.json::<T>().await.map_err(|e| Error::http(url, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_model() {
        assert_eq!(Provider::from_model("gpt-4o-mini"), Some(Provider::OpenAi));
        assert_eq!(Provider::from_model("o1-preview"), Some(Provider::OpenAi));
        assert_eq!(
            Provider::from_model("gemini-1.5-pro"),
            Some(Provider::Gemini)
        );
        assert_eq!(
            Provider::from_model("Claude-3-Haiku"),
            Some(Provider::Claude)
        );
        assert_eq!(Provider::from_model("llama3"), None);
    }

    #[test]
    fn test_provider_names_round_trip() {
        for provider in Provider::ALL {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{}\"", provider.name()));
            let back: Provider = serde_json::from_str(&json).unwrap();
            assert_eq!(back, provider);
        }
    }

    #[test]
    fn test_create_agent_requires_key() {
        let err = create_agent(AgentConfig::new(Provider::Gemini, ""))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_create_agent_picks_provider() {
        for provider in Provider::ALL {
            let agent = create_agent(AgentConfig::new(provider, "key")).unwrap();
            assert_eq!(agent.provider(), provider);
        }
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let mut config = AgentConfig::new(Provider::OpenAi, "k");
        config.base_url = "http://localhost:1234/".to_string();
        assert_eq!(
            config.endpoint("chat/completions"),
            "http://localhost:1234/chat/completions"
        );
    }
}
