//! OpenAI chat-completions agent.

use super::tools::{decode_argument_string, get_tool_definitions, ToolDefinition};
use super::{send_json, Agent, AgentConfig, Provider};
use crate::error::{Error, Result};
use crate::refactor::{RefactoringRequest, RefactoringResult, RefactoringTarget};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "openai";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default)]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Agent for the OpenAI chat-completions API.
pub struct OpenAiAgent {
    config: AgentConfig,
    http_client: reqwest::Client,
    /// Model used for extraction, reused for generation.
    model: Option<String>,
}

impl OpenAiAgent {
    pub fn new(config: AgentConfig) -> Result<Self> {
        let http_client = config.http_client()?;
        Ok(Self {
            config,
            http_client,
            model: None,
        })
    }

    async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = self.config.endpoint("chat/completions");
        let builder = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request);
        send_json(Provider::OpenAi, &url, builder).await
    }
}

#[async_trait]
impl Agent for OpenAiAgent {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn create_refactoring_target(
        &mut self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<RefactoringTarget> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::new("user", prompt)],
            temperature: Some(temperature),
            tools: get_tool_definitions(),
        };

        let response = self.chat(&request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(Error::NoResponseChoices { provider: PROVIDER })?;
        let tool_calls = choice
            .message
            .tool_calls
            .filter(|calls| !calls.is_empty())
            .ok_or(Error::NoStructuredCall { provider: PROVIDER })?;

        let mut target = RefactoringTarget::new(prompt, tool_calls[0].id.clone());
        for call in &tool_calls {
            debug!(
                "Tool call {}: {}({})",
                call.id, call.function.name, call.function.arguments
            );
            let args = decode_argument_string(&call.function.arguments)
                .map_err(|reason| Error::malformed(PROVIDER, reason))?;
            target.extend(args.pull_request_urls, args.files);
        }

        self.model = Some(model.to_string());

        Ok(target.unique())
    }

    async fn create_refactoring_result(
        &mut self,
        request: &RefactoringRequest,
        assistance_message: &str,
    ) -> Result<RefactoringResult> {
        let model = self
            .model
            .clone()
            .ok_or(Error::MissingCallState { provider: PROVIDER })?;

        // The assistant's tool_calls turn is not replayed, so no "tool"
        // message answering request.tool_call_id is sent either.
        let chat_request = ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage::new("user", &request.user_prompt),
                ChatMessage::new("assistant", assistance_message),
            ],
            temperature: None,
            tools: Vec::new(),
        };

        let response = self.chat(&chat_request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(Error::NoResponseChoices { provider: PROVIDER })?;

        Ok(RefactoringResult::new(
            choice.message.content.unwrap_or_default(),
        ))
    }
}
