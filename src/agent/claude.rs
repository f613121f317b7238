//! Anthropic messages agent using tool use.

use super::tools::{decode_arguments, extraction_function, SchemaStyle};
use super::{send_json, Agent, AgentConfig, Provider};
use crate::error::{Error, Result};
use crate::refactor::{RefactoringRequest, RefactoringResult, RefactoringTarget};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const PROVIDER: &str = "claude";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Output limit for the extraction call, which only returns a tool call.
const EXTRACTION_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse(ToolUse),
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

impl Message {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            content: MessageContent::Text(text.to_string()),
        }
    }

    fn blocks(role: &str, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: role.to_string(),
            content: MessageContent::Blocks(blocks),
        }
    }
}

#[derive(Debug, Serialize)]
struct Tool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<Message>,
    tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

/// Tool use kept from the extraction call.
#[derive(Debug, Clone)]
struct ToolUseState {
    model: String,
    tool_use: ToolUse,
}

/// Agent for the Anthropic messages API.
pub struct ClaudeAgent {
    config: AgentConfig,
    http_client: reqwest::Client,
    state: Option<ToolUseState>,
}

impl ClaudeAgent {
    pub fn new(config: AgentConfig) -> Result<Self> {
        let http_client = config.http_client()?;
        Ok(Self {
            config,
            http_client,
            state: None,
        })
    }

    async fn messages(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let url = self.config.endpoint("messages");
        let builder = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request);
        send_json(Provider::Claude, &url, builder).await
    }

    fn tools() -> Vec<Tool> {
        let function = extraction_function(SchemaStyle::JsonSchema);
        vec![Tool {
            name: function.name,
            description: function.description,
            input_schema: function.parameters,
        }]
    }
}

#[async_trait]
impl Agent for ClaudeAgent {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    async fn create_refactoring_target(
        &mut self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<RefactoringTarget> {
        // Anthropic only accepts temperatures up to 1.0, so the API default is used.
        debug!("Ignoring temperature {} for {}", temperature, PROVIDER);
        let request = MessagesRequest {
            model: model.to_string(),
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: None,
            messages: vec![Message::text("user", prompt)],
            tools: Self::tools(),
        };

        let response = self.messages(&request).await?;
        if response.content.is_empty() {
            return Err(Error::NoResponseChoices { provider: PROVIDER });
        }

        let tool_uses: Vec<ToolUse> = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse(tool_use) => Some(tool_use),
                _ => None,
            })
            .collect();
        let first = tool_uses
            .first()
            .cloned()
            .ok_or(Error::NoStructuredCall { provider: PROVIDER })?;

        let mut target = RefactoringTarget::new(prompt, first.id.clone());
        for tool_use in tool_uses {
            debug!("Tool use {}: {}({})", tool_use.id, tool_use.name, tool_use.input);
            let args = decode_arguments(tool_use.input)
                .map_err(|reason| Error::malformed(PROVIDER, reason))?;
            target.extend(args.pull_request_urls, args.files);
        }

        self.state = Some(ToolUseState {
            model: model.to_string(),
            tool_use: first,
        });

        Ok(target.unique())
    }

    async fn create_refactoring_result(
        &mut self,
        request: &RefactoringRequest,
        assistance_message: &str,
    ) -> Result<RefactoringResult> {
        let state = self
            .state
            .clone()
            .ok_or(Error::MissingCallState { provider: PROVIDER })?;

        let messages_request = MessagesRequest {
            model: state.model,
            max_tokens: self.config.max_tokens,
            temperature: None,
            messages: vec![
                Message::text("user", &request.user_prompt),
                Message::blocks("assistant", vec![ContentBlock::ToolUse(state.tool_use.clone())]),
                Message::blocks(
                    "user",
                    vec![ContentBlock::ToolResult {
                        tool_use_id: state.tool_use.id,
                        content: assistance_message.to_string(),
                    }],
                ),
            ],
            tools: Self::tools(),
        };

        let response = self.messages(&messages_request).await?;
        if response.content.is_empty() {
            return Err(Error::NoResponseChoices { provider: PROVIDER });
        }

        let text = response
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .unwrap_or_default();

        Ok(RefactoringResult::new(text))
    }
}
